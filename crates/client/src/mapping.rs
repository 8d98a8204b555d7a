use indexmap::IndexMap;

/// Renames between field names on the wire and the names callers use.
///
/// Built from a `wire name -> logical name` table; outgoing requests use the
/// inverse. Logical lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    to_logical: IndexMap<String, String>,
    to_wire: IndexMap<String, String>,
}

impl FieldMapping {
    pub fn new(table: &IndexMap<String, String>) -> Self {
        Self {
            to_logical: table.clone(),
            to_wire: table
                .iter()
                .map(|(wire, logical)| (logical.to_lowercase(), wire.clone()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_logical.is_empty()
    }

    /// Name a response field is exposed under.
    pub fn logical<'a>(&'a self, wire: &'a str) -> &'a str {
        self.to_logical.get(wire).map(String::as_str).unwrap_or(wire)
    }

    /// Name sent to the server for a caller-supplied field.
    pub fn wire<'a>(&'a self, logical: &'a str) -> &'a str {
        self.to_wire
            .get(&logical.to_lowercase())
            .map(String::as_str)
            .unwrap_or(logical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_both_directions() {
        let table = IndexMap::from([("Name First".to_string(), "first_name".to_string())]);
        let mapping = FieldMapping::new(&table);
        assert_eq!(mapping.logical("Name First"), "first_name");
        assert_eq!(mapping.wire("First_Name"), "Name First");
        assert_eq!(mapping.wire("other"), "other");
        assert_eq!(mapping.logical("other"), "other");
    }
}

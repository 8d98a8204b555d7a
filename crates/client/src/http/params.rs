use {indexmap::IndexMap, std::fmt};

/// One parameter value; repeated values expand to `name(1)`, `name(2)`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Repeated(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Repeated(values)
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Single(value.to_string())
    }
}

/// Ordered request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(IndexMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.0.shift_remove(name)
    }

    pub fn extend(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Renames every key through `rename`.
    pub fn map_keys<F: Fn(&str) -> String>(self, rename: F) -> Params {
        Params(self.0.into_iter().map(|(k, v)| (rename(&k), v)).collect())
    }

    /// Form pairs with repeated values expanded.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = Vec::with_capacity(self.0.len());
        for (name, value) in &self.0 {
            match value {
                ParamValue::Single(value) => form.push((name.clone(), value.clone())),
                ParamValue::Repeated(values) => form.extend(
                    values
                        .iter()
                        .enumerate()
                        .map(|(i, value)| (format!("{name}({})", i + 1), value.clone())),
                ),
            }
        }
        form
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = self.to_form();
        let rendered = itertools::join(pairs.iter().map(|(k, v)| format!("{k}={v}")), "&");
        f.write_str(&rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn repeated_values_expand_with_indices() {
        let params = Params::new()
            .with("-db", "Contacts")
            .with("phone", vec!["555-1234".to_string(), "555-9876".to_string()])
            .with("-new", "");

        assert_eq!(
            params.to_form(),
            vec![
                ("-db".to_string(), "Contacts".to_string()),
                ("phone(1)".to_string(), "555-1234".to_string()),
                ("phone(2)".to_string(), "555-9876".to_string()),
                ("-new".to_string(), String::new()),
            ]
        );
        assert_eq!(params.to_string(), "-db=Contacts&phone(1)=555-1234&phone(2)=555-9876&-new=");
    }
}

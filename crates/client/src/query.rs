//! Structured find criteria and their translation into `-findquery`
//! parameters.
//!
//! Every field value gets an indexed slot (`-q{n}` holds the field name,
//! `-q{n}.value` the value). A field given several values is an OR group;
//! each request contributes one AND term per combination that picks one slot
//! from every group. Terms are rendered as `(q0,q2)`, negated with `!` for
//! omitted requests and joined with `;`.
//!
//! ```rust
//! use filemaker_client::{query::{FindCriteria, FindRequest}, FieldMapping};
//!
//! let criteria = FindCriteria::from(
//!     FindRequest::new().field("name", ["Bill", "Will"]).field("dept", "Sales"),
//! );
//! let query = criteria.build(&FieldMapping::default());
//! assert_eq!(query.expression(), Some("(q0,q2);(q1,q2)"));
//! ```

use {
    crate::{
        http::{Action, ParamValue, Params},
        mapping::FieldMapping,
    },
    indexmap::IndexMap,
    itertools::Itertools,
};

/// Value constraint for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    One(String),
    /// Matches any of the values. An empty list searches for an empty field.
    Any(Vec<String>),
}

impl From<&str> for Criterion {
    fn from(value: &str) -> Self {
        Criterion::One(value.to_string())
    }
}

impl From<String> for Criterion {
    fn from(value: String) -> Self {
        Criterion::One(value)
    }
}

impl From<Vec<String>> for Criterion {
    fn from(values: Vec<String>) -> Self {
        Criterion::Any(values)
    }
}

impl From<Vec<&str>> for Criterion {
    fn from(values: Vec<&str>) -> Self {
        Criterion::Any(values.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Criterion {
    fn from(values: [&str; N]) -> Self {
        Criterion::Any(values.iter().map(|v| v.to_string()).collect())
    }
}

impl Criterion {
    fn values(&self) -> Vec<&str> {
        match self {
            Criterion::One(value) => vec![value.as_str()],
            Criterion::Any(values) if values.is_empty() => vec![""],
            Criterion::Any(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// One find request: every field must match; `omit` excludes the matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindRequest {
    pub fields: IndexMap<String, Criterion>,
    pub omit: bool,
}

impl FindRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, criterion: impl Into<Criterion>) -> Self {
        self.fields.insert(name.into(), criterion.into());
        self
    }

    pub fn omit(mut self) -> Self {
        self.omit = true;
        self
    }

    /// The field/value pairs of a request the plain `-find` form can
    /// express: no omit flag and a single value per field.
    fn single_values(&self) -> Option<Vec<(&str, &str)>> {
        if self.omit {
            return None;
        }
        self.fields
            .iter()
            .map(|(field, criterion)| match criterion {
                Criterion::One(value) => Some((field.as_str(), value.as_str())),
                Criterion::Any(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindCriteria {
    /// Direct lookup by record id.
    RecordId(String),
    Request(FindRequest),
    /// Requests evaluated in order; omitted ones remove from the found set.
    Compound(Vec<FindRequest>),
}

impl From<FindRequest> for FindCriteria {
    fn from(request: FindRequest) -> Self {
        FindCriteria::Request(request)
    }
}

impl From<Vec<FindRequest>> for FindCriteria {
    fn from(requests: Vec<FindRequest>) -> Self {
        FindCriteria::Compound(requests)
    }
}

/// Action and parameters a find translates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundQuery {
    pub action: Action,
    pub params: Params,
}

impl CompoundQuery {
    /// The `-query` expression, for `-findquery`.
    pub fn expression(&self) -> Option<&str> {
        match self.params.get("-query") {
            Some(ParamValue::Single(expression)) => Some(expression),
            _ => None,
        }
    }
}

#[derive(Default)]
struct SlotAllocator {
    params: Params,
    next: usize,
}

impl SlotAllocator {
    /// Allocates one slot per value and returns the slot names.
    fn allocate(&mut self, field: &str, criterion: &Criterion) -> Vec<String> {
        criterion
            .values()
            .into_iter()
            .map(|value| {
                let slot = format!("q{}", self.next);
                self.params.insert(format!("-{slot}"), field);
                self.params.insert(format!("-{slot}.value"), value);
                self.next += 1;
                slot
            })
            .collect()
    }

    /// AND terms of one request: the product of its OR groups, first group outermost.
    fn terms(&mut self, request: &FindRequest, mapping: &FieldMapping) -> Vec<String> {
        let groups = request
            .fields
            .iter()
            .map(|(field, criterion)| self.allocate(mapping.wire(field), criterion))
            .collect::<Vec<_>>();
        let negation = if request.omit { "!" } else { "" };
        groups
            .iter()
            .fold(vec![Vec::new()], |terms: Vec<Vec<&str>>, group| {
                terms
                    .iter()
                    .flat_map(|prefix| {
                        group.iter().map(move |slot| {
                            let mut term = prefix.clone();
                            term.push(slot.as_str());
                            term
                        })
                    })
                    .collect()
            })
            .into_iter()
            .map(|term| format!("{negation}({})", term.join(",")))
            .collect()
    }
}

impl FindCriteria {
    /// Translates the criteria. Field names pass through `mapping` as
    /// slots are allocated.
    pub fn build(&self, mapping: &FieldMapping) -> CompoundQuery {
        match self {
            FindCriteria::RecordId(id) => CompoundQuery {
                action: Action::Find,
                params: Params::new().with("-recid", id.as_str()),
            },
            FindCriteria::Request(request) => match request.single_values() {
                Some(pairs) => CompoundQuery {
                    action: Action::Find,
                    params: pairs
                        .into_iter()
                        .map(|(field, value)| (mapping.wire(field).to_string(), value.to_string()))
                        .collect(),
                },
                None => Self::compound(std::slice::from_ref(request), mapping),
            },
            FindCriteria::Compound(requests) => Self::compound(requests, mapping),
        }
    }

    fn compound(requests: &[FindRequest], mapping: &FieldMapping) -> CompoundQuery {
        let mut slots = SlotAllocator::default();
        let expression = requests
            .iter()
            .flat_map(|request| slots.terms(request, mapping))
            .join(";");
        let mut params = slots.params;
        params.insert("-query", expression);
        CompoundQuery {
            action: Action::FindQuery,
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn form(query: &CompoundQuery) -> Vec<(String, String)> {
        query.params.to_form()
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn or_values_expand_into_one_term_per_combination() {
        let query = FindCriteria::from(
            FindRequest::new()
                .field("name", ["Bill", "Will"])
                .field("dept", "Sales"),
        )
        .build(&FieldMapping::default());

        assert_eq!(query.action, Action::FindQuery);
        assert_eq!(
            form(&query),
            pairs(&[
                ("-q0", "name"),
                ("-q0.value", "Bill"),
                ("-q1", "name"),
                ("-q1.value", "Will"),
                ("-q2", "dept"),
                ("-q2.value", "Sales"),
                ("-query", "(q0,q2);(q1,q2)"),
            ])
        );
    }

    #[test]
    fn slots_number_across_requests_and_omits_negate() {
        let query = FindCriteria::from(vec![
            FindRequest::new()
                .field("field1", ["a", "b", "c"])
                .field("field2", "d"),
            FindRequest::new().field("field3", "e").field("field4", "f").omit(),
            FindRequest::new()
                .field("field5", ["g", "h"])
                .field("field6", ["i", "j"])
                .omit(),
        ])
        .build(&FieldMapping::default());

        assert_eq!(
            query.expression(),
            Some("(q0,q3);(q1,q3);(q2,q3);!(q4,q5);!(q6,q8);!(q6,q9);!(q7,q8);!(q7,q9)")
        );
        assert_eq!(query.params.len(), 2 * 10 + 1);
    }

    #[test]
    fn empty_value_list_searches_for_empty_field() {
        let query = FindCriteria::from(
            FindRequest::new()
                .field("email", Vec::<String>::new())
                .field("dept", "Sales"),
        )
        .build(&FieldMapping::default());
        assert_eq!(query.params.get("-q0.value"), Some(&ParamValue::Single(String::new())));
        assert_eq!(query.expression(), Some("(q0,q1)"));
    }

    #[test]
    fn omitted_empty_request_is_a_negated_empty_term() {
        let query = FindCriteria::from(FindRequest::new().omit()).build(&FieldMapping::default());
        assert_eq!(query.action, Action::FindQuery);
        assert_eq!(query.expression(), Some("!()"));
    }

    #[test]
    fn plain_request_uses_simple_find() {
        let mapping = FieldMapping::new(&IndexMap::from([(
            "Name First".to_string(),
            "first".to_string(),
        )]));
        let query = FindCriteria::from(
            FindRequest::new().field("first", "Bill").field("dept", "Sales"),
        )
        .build(&mapping);
        assert_eq!(query.action, Action::Find);
        assert_eq!(form(&query), pairs(&[("Name First", "Bill"), ("dept", "Sales")]));
    }

    #[test]
    fn value_lists_and_omits_need_findquery() {
        let mapping = FieldMapping::default();
        let listed = FindCriteria::from(FindRequest::new().field("name", ["Bill"]).field("dept", "Sales"))
            .build(&mapping);
        assert_eq!(listed.action, Action::FindQuery);
        assert_eq!(listed.expression(), Some("(q0,q1)"));

        let omitted = FindCriteria::from(FindRequest::new().field("dept", "Sales").omit()).build(&mapping);
        assert_eq!(omitted.action, Action::FindQuery);
        assert_eq!(omitted.expression(), Some("!(q0)"));
    }

    #[test]
    fn slots_carry_mapped_field_names() {
        let mapping = FieldMapping::new(&IndexMap::from([(
            "Name First".to_string(),
            "first".to_string(),
        )]));
        let query = FindCriteria::from(FindRequest::new().field("First", ["Bill", "Will"]))
            .build(&mapping);
        assert_eq!(query.params.get("-q1"), Some(&ParamValue::Single("Name First".into())));
        assert_eq!(query.expression(), Some("(q0);(q1)"));
    }

    #[test]
    fn record_id_finds_by_recid() {
        let query = FindCriteria::RecordId("42".into()).build(&FieldMapping::default());
        assert_eq!(query.action, Action::Find);
        assert_eq!(form(&query), pairs(&[("-recid", "42")]));
    }
}

//! Per-request options and their expansion into wire parameters.

use {
    super::params::Params,
    crate::{err::Error, grammar::Grammar, mapping::FieldMapping, Result},
    std::fmt,
};

/// Most sort fields (and sort orders) one request may carry.
pub const MAX_SORT_FIELDS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOrder {
    Ascend,
    Descend,
    /// Sort by the order of a value list.
    ValueList(String),
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascend => f.write_str("ascend"),
            SortOrder::Descend => f.write_str("descend"),
            SortOrder::ValueList(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => f.write_str("and"),
            LogicalOperator::Or => f.write_str("or"),
        }
    }
}

/// A script to run on the server, with an optional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub name: String,
    pub param: Option<String>,
}

impl Script {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param: None,
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    fn expand(&self, key: &str, params: &mut Params) {
        params.insert(key, self.name.as_str());
        if let Some(param) = &self.param {
            params.insert(format!("{key}.param"), param.as_str());
        }
    }
}

impl From<&str> for Script {
    fn from(name: &str) -> Self {
        Script::new(name)
    }
}

/// Options of one request: sorting, scripts, paging, portals, response layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub max_records: Option<usize>,
    pub skip_records: Option<usize>,
    pub sort_field: Vec<String>,
    pub sort_order: Vec<SortOrder>,
    pub post_script: Option<Script>,
    pub pre_find_script: Option<Script>,
    pub pre_sort_script: Option<Script>,
    pub response_layout: Option<String>,
    pub logical_operator: Option<LogicalOperator>,
    pub modification_id: Option<String>,
    pub max_portal_rows: Option<usize>,
    pub ignore_portals: bool,
    /// Response grammar; the configured default when absent.
    pub grammar: Option<Grammar>,
}

impl RequestOptions {
    pub fn max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    pub fn skip_records(mut self, skip: usize) -> Self {
        self.skip_records = Some(skip);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_field.push(field.into());
        self.sort_order.push(order);
        self
    }

    pub fn grammar(mut self, grammar: Grammar) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// Wire parameters for these options. Sort fields go through `mapping`.
    pub fn expand(&self, mapping: &FieldMapping) -> Result<Params> {
        let mut params = Params::new();

        if self.ignore_portals {
            params.insert("-relatedsets.max", 0usize);
            params.insert("-relatedsets.filter", "layout");
        } else if let Some(rows) = self.max_portal_rows {
            params.insert("-relatedsets.max", rows);
            params.insert("-relatedsets.filter", "layout");
        }
        if let Some(max) = self.max_records {
            params.insert("-max", max);
        }
        if let Some(skip) = self.skip_records {
            params.insert("-skip", skip);
        }

        if self.sort_field.len() > MAX_SORT_FIELDS {
            return Err(Error::parameter(format!(
                "{} sort fields given; at most {MAX_SORT_FIELDS} are allowed",
                self.sort_field.len()
            )));
        }
        if self.sort_order.len() > MAX_SORT_FIELDS {
            return Err(Error::parameter(format!(
                "{} sort orders given; at most {MAX_SORT_FIELDS} are allowed",
                self.sort_order.len()
            )));
        }
        for (i, field) in self.sort_field.iter().enumerate() {
            params.insert(format!("-sortfield.{}", i + 1), mapping.wire(field));
        }
        for (i, order) in self.sort_order.iter().enumerate() {
            params.insert(format!("-sortorder.{}", i + 1), order.to_string());
        }

        if let Some(script) = &self.post_script {
            script.expand("-script", &mut params);
        }
        if let Some(script) = &self.pre_find_script {
            script.expand("-script.prefind", &mut params);
        }
        if let Some(script) = &self.pre_sort_script {
            script.expand("-script.presort", &mut params);
        }
        if let Some(layout) = &self.response_layout {
            params.insert("-lay.response", layout.as_str());
        }
        if let Some(operator) = self.logical_operator {
            params.insert("-lop", operator.to_string());
        }
        if let Some(mod_id) = &self.modification_id {
            params.insert("-modid", mod_id.as_str());
        }
        Ok(params)
    }
}

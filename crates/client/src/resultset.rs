//! Record-bearing responses (`fmresultset`) and the hook target that builds them.

use {
    crate::{
        err::FileMakerError,
        layout::Layout,
        mapping::FieldMapping,
        metadata::Field,
        record::Record,
        value::{Formats, Value},
        Error, Result,
    },
    derive_getters::Getters,
    filemaker_sax::{Closed, Node, SaxError, Target},
    indexmap::IndexMap,
    serde::Serialize,
    std::{ops::Deref, sync::Arc},
    tracing::{trace, warn},
};

/// Field metadata and formats shared by every record of a response.
#[derive(Debug, Clone, Default, Getters)]
pub struct Schema {
    database: Option<String>,
    layout: Option<String>,
    table: Option<String>,
    formats: Formats,
    /// Keyed by lowercased logical field name.
    fields: IndexMap<String, Field>,
    /// Portal table (lowercased) to its fields, keyed by the lowercased
    /// name after `Table::`.
    portals: IndexMap<String, IndexMap<String, Field>>,
    mapping: FieldMapping,
}

impl Schema {
    pub fn new(mapping: FieldMapping) -> Self {
        Self {
            mapping,
            ..Self::default()
        }
    }

    /// Registers a field definition under `key`.
    pub fn insert_field(&mut self, key: &str, field: Field) {
        self.fields.insert(key.to_lowercase(), field);
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.get(&key.to_lowercase())
    }

    /// Whether `key` names a known field. A repetition suffix (`phone.2`) is ignored.
    pub fn knows(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        let base = key.split('.').next().unwrap_or_default();
        self.fields.contains_key(base)
    }

    pub fn field_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Field names as reported by the server.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.values().map(|field| field.name().as_str()).collect()
    }

    pub fn portal_names(&self) -> impl Iterator<Item = &str> {
        self.portals.keys().map(String::as_str)
    }

    pub fn portal(&self, table: &str) -> Option<&IndexMap<String, Field>> {
        self.portals.get(&table.to_lowercase())
    }

    /// Record key for a field arriving under `wire` at the top level.
    pub(crate) fn record_key(&self, wire: &str) -> String {
        self.mapping.logical(wire).to_lowercase()
    }

    /// Record key for a portal field arriving as `Table::field`.
    pub(crate) fn portal_key(&self, wire: &str) -> String {
        let logical = self.mapping.logical(wire);
        logical
            .rsplit_once("::")
            .map(|(_, field)| field)
            .unwrap_or(logical)
            .to_lowercase()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Getters)]
pub struct Product {
    name: Option<String>,
    version: Option<String>,
    build: Option<String>,
}

/// Response-scoped counts and status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Getters)]
pub struct ResultsetMeta {
    error_code: u32,
    product: Product,
    total_count: usize,
    foundset_count: usize,
    fetch_size: usize,
    doctype: Option<String>,
}

/// Records of one response, with their metadata.
#[derive(Debug, Clone)]
pub struct Resultset {
    records: Vec<Record>,
    meta: ResultsetMeta,
    schema: Arc<Schema>,
}

impl Resultset {
    pub fn meta(&self) -> &ResultsetMeta {
        &self.meta
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn total_count(&self) -> usize {
        self.meta.total_count
    }

    pub fn foundset_count(&self) -> usize {
        self.meta.foundset_count
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.schema.field_names()
    }
}

impl Deref for Resultset {
    type Target = [Record];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl IntoIterator for Resultset {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Resultset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl Serialize for Resultset {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.records.iter())
    }
}

fn count(node: &Node, attribute: &str) -> usize {
    node.attribute(attribute)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn owned(node: &Node, attribute: &str) -> Option<String> {
    node.attribute(attribute).map(str::to_string)
}

/// Reads the `field` children of a record node into coerced values.
pub(crate) fn read_values(
    node: &Node,
    fields: &IndexMap<String, Field>,
    key_of: impl Fn(&str) -> String,
    formats: &Formats,
    ignore_bad_data: bool,
) -> Result<IndexMap<String, Value>> {
    let mut values = IndexMap::new();
    let Some(columns) = node.get("field").and_then(Node::as_keyed) else {
        return Ok(values);
    };
    for (_, column) in columns.entries() {
        let wire = column.attribute("name").unwrap_or_default();
        let key = key_of(wire);
        let raws = column
            .get("data")
            .map(|data| data.items().map(|d| d.text().unwrap_or_default()).collect::<Vec<_>>())
            .unwrap_or_default();
        let field = fields
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Field::new(wire, crate::metadata::FieldType::Text));
        let value = match field.coerce_all(raws, formats) {
            Ok(value) => value,
            Err(err) if ignore_bad_data => {
                warn!(field = %wire, error = %err, "ignoring bad data");
                Value::Null
            }
            Err(err) => return Err(err),
        };
        values.insert(key, value);
    }
    Ok(values)
}

/// Hook target for the `fmresultset` grammar.
#[derive(Debug)]
pub struct ResultsetBuilder {
    layout: Option<Layout>,
    raise_on_401: bool,
    ignore_bad_data: bool,
    schema: Schema,
    frozen: Option<Arc<Schema>>,
    meta: ResultsetMeta,
    records: Vec<Record>,
}

impl ResultsetBuilder {
    pub fn new(mapping: FieldMapping, raise_on_401: bool, ignore_bad_data: bool) -> Self {
        Self {
            layout: None,
            raise_on_401,
            ignore_bad_data,
            schema: Schema::new(mapping),
            frozen: None,
            meta: ResultsetMeta::default(),
            records: Vec::new(),
        }
    }

    /// Binds the records built to `layout`, so they can be saved.
    pub fn for_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn finish(self) -> Resultset {
        Resultset {
            schema: self.frozen.unwrap_or_else(|| Arc::new(self.schema)),
            meta: self.meta,
            records: self.records,
        }
    }

    /// The schema is complete once records start arriving.
    fn frozen_schema(&mut self) -> Arc<Schema> {
        let schema = &self.schema;
        Arc::clone(
            self.frozen
                .get_or_insert_with(|| Arc::new(schema.clone())),
        )
    }

    fn receive_datasource(&mut self, node: &Node) {
        self.schema.database = owned(node, "database");
        self.schema.layout = owned(node, "layout");
        self.schema.table = owned(node, "table");
        self.schema.formats = Formats::from_filemaker(
            node.attribute("date_format"),
            node.attribute("time_format"),
            node.attribute("timestamp_format"),
        );
        self.meta.total_count = count(node, "total_count");
    }

    fn receive_field_definition(&mut self, node: &Node) {
        let field = Field::from_definition(node);
        let key = self.schema.record_key(field.name());
        self.schema.fields.insert(key, field);
    }

    fn receive_relatedset_definition(&mut self, node: &Node) {
        let table = node.attribute("table").unwrap_or_default().to_lowercase();
        let fields = node
            .get("field_definition")
            .and_then(Node::as_keyed)
            .map(|definitions| {
                definitions
                    .entries()
                    .map(|(_, definition)| {
                        let field = Field::from_definition(definition);
                        (self.schema.portal_key(field.name()), field)
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.schema.portals.insert(table, fields);
    }

    fn receive_record(&mut self, node: &Node) -> Result<()> {
        let schema = self.frozen_schema();
        let record = Record::from_node(node, schema, self.layout.clone(), self.ignore_bad_data)?;
        self.records.push(record);
        Ok(())
    }
}

impl Target for ResultsetBuilder {
    type Error = Error;

    fn before_close(&mut self, hook: &str, closed: &Closed<'_>) -> Result<()> {
        trace!(hook, depth = closed.depth, "resultset");
        let node = closed.node;
        match hook {
            "doctype" => self.meta.doctype = owned(node, "value"),
            "error" => {
                let code = FileMakerError::parse_code(node.attribute("code"));
                self.meta.error_code = code;
                FileMakerError::check(code, self.raise_on_401)?;
            }
            "product" => {
                self.meta.product = Product {
                    name: owned(node, "name"),
                    version: owned(node, "version"),
                    build: owned(node, "build"),
                }
            }
            "datasource" => self.receive_datasource(node),
            "field_definition" => self.receive_field_definition(node),
            "relatedset_definition" => self.receive_relatedset_definition(node),
            "resultset" => {
                self.meta.foundset_count = count(node, "count");
                self.meta.fetch_size = count(node, "fetch_size");
            }
            "record" => self.receive_record(node)?,
            other => {
                return Err(SaxError::UnknownHook {
                    hook: other.to_string(),
                    tag: closed.tag.to_string(),
                }
                .into())
            }
        }
        Ok(())
    }
}

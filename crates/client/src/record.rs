//! A single record: typed values, pending edits and portal rows.

use {
    crate::{
        http::{Params, RequestOptions},
        layout::Layout,
        resultset::{read_values, Schema},
        value::Value,
        Error, Result,
    },
    filemaker_sax::Node,
    indexmap::IndexMap,
    serde::{ser::SerializeMap, Serialize, Serializer},
    std::sync::Arc,
    tracing::{debug, instrument},
};

static NULL: Value = Value::Null;

/// Case-insensitive keyed bag of field values.
///
/// Writes are validated against the layout's field keys and buffered until
/// [`Record::save`]; reads see the written value immediately.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    layout: Option<Layout>,
    values: IndexMap<String, Value>,
    mods: Params,
    record_id: Option<String>,
    mod_id: Option<String>,
    portals: IndexMap<String, Vec<Record>>,
    deleted: bool,
}

impl Record {
    /// An unsaved record with every known field set to null.
    pub fn new(schema: Arc<Schema>, layout: Option<Layout>) -> Self {
        let values = schema
            .field_keys()
            .map(|key| (key.to_string(), Value::Null))
            .collect();
        Self {
            schema,
            layout,
            values,
            mods: Params::new(),
            record_id: None,
            mod_id: None,
            portals: IndexMap::new(),
            deleted: false,
        }
    }

    /// Builds a record from a mapped `record` element.
    pub(crate) fn from_node(
        node: &Node,
        schema: Arc<Schema>,
        layout: Option<Layout>,
        ignore_bad_data: bool,
    ) -> Result<Self> {
        let values = read_values(
            node,
            schema.fields(),
            |wire| schema.record_key(wire),
            schema.formats(),
            ignore_bad_data,
        )?;

        let mut portals = IndexMap::new();
        if let Some(sets) = node.get("relatedset").and_then(Node::as_keyed) {
            for (table, rows) in sets.entries() {
                let empty = IndexMap::new();
                let fields = schema.portal(table).unwrap_or(&empty);
                let rows = rows
                    .as_list()
                    .map(|list| list.items())
                    .unwrap_or_default()
                    .iter()
                    .map(|row| {
                        Ok(Record {
                            values: read_values(
                                row,
                                fields,
                                |wire| schema.portal_key(wire),
                                schema.formats(),
                                ignore_bad_data,
                            )?,
                            ..Record::bare(Arc::clone(&schema), row)
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                portals.insert(table.to_string(), rows);
            }
        }

        Ok(Record {
            values,
            portals,
            layout,
            ..Record::bare(schema, node)
        })
    }

    fn bare(schema: Arc<Schema>, node: &Node) -> Self {
        Self {
            schema,
            layout: None,
            values: IndexMap::new(),
            mods: Params::new(),
            record_id: node.attribute("record_id").map(str::to_string),
            mod_id: node.attribute("mod_id").map(str::to_string),
            portals: IndexMap::new(),
            deleted: false,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn mod_id(&self) -> Option<&str> {
        self.mod_id.as_deref()
    }

    /// Pending edits, keyed by lowercased field name, already rendered to wire text.
    pub fn mods(&self) -> &Params {
        &self.mods
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn portals(&self) -> &IndexMap<String, Vec<Record>> {
        &self.portals
    }

    /// Rows of the portal for `table`, matched case-insensitively.
    pub fn portal(&self, table: &str) -> Option<&[Record]> {
        self.portals.get(&table.to_lowercase()).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Reads a field. An empty key reads as null.
    pub fn get(&self, key: &str) -> Result<&Value> {
        if key.is_empty() {
            return Ok(&NULL);
        }
        let key = key.to_lowercase();
        match self.values.get(&key) {
            Some(value) => Ok(value),
            None if self.schema.knows(&key) => Ok(&NULL),
            None => Err(Error::FieldNotFound { field: key }),
        }
    }

    /// Buffers a write. Unknown fields fail without touching the buffer.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        if self.deleted {
            return Err(Error::parameter("the record has been deleted"));
        }
        let key = key.to_lowercase();
        if !self.values.contains_key(&key) && !self.schema.knows(&key) {
            return Err(Error::FieldNotFound { field: key });
        }
        let value = match self.schema.field(&key) {
            Some(field) => value.into().conform_to(field.result()),
            None => value.into(),
        };
        self.mods
            .insert(key.as_str(), value.to_wire(self.schema.formats()));
        self.values.insert(key, value);
        Ok(())
    }

    /// Drops pending edits. Values already written locally are kept.
    pub fn discard(&mut self) {
        self.mods.clear();
    }

    fn bound_layout(&self) -> Result<Layout> {
        self.layout
            .clone()
            .ok_or_else(|| Error::parameter("the record is not bound to a layout"))
    }

    /// Creates or edits the record on the server, then reloads it from the
    /// server's answer. Does nothing without pending edits.
    #[instrument(name = "filemaker.record.save", skip(self), fields(record_id = ?self.record_id), err)]
    pub async fn save(&mut self) -> Result<()> {
        self.commit(RequestOptions::default()).await
    }

    /// Like [`Record::save`], but the server rejects the edit when the
    /// record changed since it was read.
    #[instrument(
        name = "filemaker.record.save_if_not_modified",
        skip(self),
        fields(record_id = ?self.record_id, mod_id = ?self.mod_id),
        err
    )]
    pub async fn save_if_not_modified(&mut self) -> Result<()> {
        let request = RequestOptions {
            modification_id: self.mod_id.clone(),
            ..RequestOptions::default()
        };
        self.commit(request).await
    }

    async fn commit(&mut self, request: RequestOptions) -> Result<()> {
        if self.mods.is_empty() {
            return Ok(());
        }
        if self.deleted {
            return Err(Error::parameter("the record has been deleted"));
        }
        let layout = self.bound_layout()?;
        let mods = self.mods.clone();
        let resultset = match &self.record_id {
            Some(id) => layout.edit(id, mods, request).await?,
            None => layout.create(mods, request).await?,
        };
        if let Some(fresh) = resultset.into_records().into_iter().next() {
            self.replace_with_fresh_data(fresh);
        }
        self.mods.clear();
        Ok(())
    }

    /// Deletes the record on the server. The record is frozen afterwards.
    #[instrument(name = "filemaker.record.destroy", skip(self), fields(record_id = ?self.record_id), err)]
    #[pseudonym::alias(delete)]
    pub async fn destroy(&mut self) -> Result<()> {
        let id = self
            .record_id
            .clone()
            .ok_or_else(|| Error::parameter("the record has not been saved"))?;
        self.bound_layout()?
            .delete(&id, RequestOptions::default())
            .await?;
        debug!(record_id = %id, "record deleted");
        self.mods.clear();
        self.deleted = true;
        Ok(())
    }

    /// Replaces every value, id, token and portal with those of `fresh`.
    pub fn replace_with_fresh_data(&mut self, fresh: Record) {
        self.schema = fresh.schema;
        self.values = fresh.values;
        self.record_id = fresh.record_id;
        self.mod_id = fresh.mod_id;
        self.portals = fresh.portals;
        self.mods = fresh.mods;
        if fresh.layout.is_some() {
            self.layout = fresh.layout;
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(id) = &self.record_id {
            map.serialize_entry("-recid", id)?;
        }
        if let Some(mod_id) = &self.mod_id {
            map.serialize_entry("-modid", mod_id)?;
        }
        for (key, value) in &self.values {
            map.serialize_entry(key, value)?;
        }
        for (table, rows) in &self.portals {
            map.serialize_entry(table, rows)?;
        }
        map.end()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
            && self.record_id == other.record_id
            && self.mod_id == other.mod_id
            && self.portals == other.portals
            && self.mods == other.mods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        http::ParamValue,
        mapping::FieldMapping,
        metadata::{Field, FieldType},
    };
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn schema() -> Arc<Schema> {
        let mut schema = Schema::new(FieldMapping::default());
        schema.insert_field("first", Field::new("First", FieldType::Text));
        schema.insert_field("born", Field::new("Born", FieldType::Date));
        Arc::new(schema)
    }

    #[test]
    fn unknown_field_write_fails_without_buffering() {
        let mut record = Record::new(schema(), None);
        let err = record.set("nickname", "Billy").unwrap_err();
        assert!(matches!(err, Error::FieldNotFound { ref field } if field == "nickname"));
        assert!(record.mods().is_empty());
        assert!(record.get("nickname").is_err());
    }

    #[test]
    fn writes_render_to_wire_and_read_back() {
        let mut record = Record::new(schema(), None);
        assert_eq!(record.get("FIRST").unwrap(), &Value::Null);
        assert_eq!(record.get("").unwrap(), &Value::Null);

        record.set("First", "Bill").unwrap();
        record
            .set("born", NaiveDate::from_ymd_opt(1970, 1, 31).unwrap())
            .unwrap();
        assert_eq!(record.get("first").unwrap(), &Value::from("Bill"));
        assert_eq!(
            record.mods().get("born"),
            Some(&ParamValue::Single("01/31/1970".into()))
        );

        record.discard();
        assert!(record.mods().is_empty());
        assert_eq!(record.get("first").unwrap(), &Value::from("Bill"));
    }

    #[test]
    fn temporal_writes_follow_the_declared_field_type() {
        let mut schema = Schema::new(FieldMapping::default());
        schema.insert_field("born", Field::new("Born", FieldType::Date));
        schema.insert_field("alarm", Field::new("Alarm", FieldType::Time));
        schema.insert_field("stamped", Field::new("Stamped", FieldType::Timestamp));
        let mut record = Record::new(Arc::new(schema), None);

        let stamp = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(13, 5, 0)
            .unwrap();
        record.set("born", stamp).unwrap();
        record.set("alarm", stamp).unwrap();
        record
            .set("stamped", NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
            .unwrap();

        assert_eq!(
            record.mods().get("born"),
            Some(&ParamValue::Single("03/09/2024".into()))
        );
        assert_eq!(
            record.mods().get("alarm"),
            Some(&ParamValue::Single("13:05:00".into()))
        );
        assert_eq!(
            record.mods().get("stamped"),
            Some(&ParamValue::Single("03/09/2024 00:00:00".into()))
        );
        assert_eq!(
            record.get("born").unwrap(),
            &Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
        );
    }

    #[test]
    fn repetition_keys_are_accepted() {
        let mut record = Record::new(schema(), None);
        record.set("first.2", "Will").unwrap();
        assert_eq!(record.mods().len(), 1);
    }

    #[tokio::test]
    async fn save_without_edits_is_a_no_op() -> anyhow::Result<()> {
        let mut record = Record::new(schema(), None);
        record.save().await?;
        assert!(record.record_id().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn save_needs_a_layout() {
        let mut record = Record::new(schema(), None);
        record.set("first", "Bill").unwrap();
        assert!(matches!(record.save().await, Err(Error::Parameter(_))));
        assert_eq!(record.mods().len(), 1);
    }
}

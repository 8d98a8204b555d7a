//! Layout metadata: field controls and value lists from the `FMPXMLLAYOUT` grammar.

use {
    crate::{err::FileMakerError, mapping::FieldMapping, Error},
    derive_getters::Getters,
    filemaker_sax::{Closed, Node, Target},
    indexmap::IndexMap,
    serde::Serialize,
    tracing::trace,
};

/// How a field is presented on the layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStyle {
    EditBox,
    PopupMenu,
    CheckboxSet,
    RadioButtonSet,
    PopupList,
    Calendar,
    Scrollable,
    Other(String),
}

impl From<&str> for FieldStyle {
    fn from(style: &str) -> Self {
        match style {
            "EDITTEXT" => FieldStyle::EditBox,
            "POPUPMENU" => FieldStyle::PopupMenu,
            "CHECKBOX" => FieldStyle::CheckboxSet,
            "RADIOBUTTONS" => FieldStyle::RadioButtonSet,
            "POPUPLIST" => FieldStyle::PopupList,
            "CALENDAR" => FieldStyle::Calendar,
            "SCROLLTEXT" => FieldStyle::Scrollable,
            other => FieldStyle::Other(other.to_string()),
        }
    }
}

/// One control for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct FieldControl {
    name: String,
    style: FieldStyle,
    value_list_name: Option<String>,
}

impl FieldControl {
    /// Items of the value list this control draws from.
    pub fn value_list<'m>(&self, meta: &'m LayoutMeta) -> Option<&'m [ValueListItem]> {
        self.value_list_name
            .as_deref()
            .and_then(|name| meta.value_list(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct ValueListItem {
    value: String,
    display: String,
    value_list_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Getters)]
pub struct LayoutMeta {
    database: Option<String>,
    layout: Option<String>,
    /// Keyed by lowercased, mapped field name. A field placed more than once
    /// has one control per placement.
    field_controls: IndexMap<String, Vec<FieldControl>>,
    /// Keyed by value list name as reported.
    value_lists: IndexMap<String, Vec<ValueListItem>>,
}

impl LayoutMeta {
    /// Field names as reported, one per field, in layout order.
    pub fn field_names(&self) -> Vec<&str> {
        self.field_controls
            .values()
            .filter_map(|controls| controls.first())
            .map(|control| control.name.as_str())
            .collect()
    }

    pub fn field_keys(&self) -> impl Iterator<Item = &str> {
        self.field_controls.keys().map(String::as_str)
    }

    pub fn field_control(&self, name: &str) -> Option<&[FieldControl]> {
        self.field_controls
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
    }

    /// Case-insensitive lookup of a value list.
    pub fn value_list(&self, name: &str) -> Option<&[ValueListItem]> {
        self.value_lists
            .iter()
            .find(|(list, _)| list.eq_ignore_ascii_case(name))
            .map(|(_, items)| items.as_slice())
    }
}

/// Hook target building a [`LayoutMeta`].
#[derive(Debug)]
pub struct LayoutMetaBuilder {
    mapping: FieldMapping,
    raise_on_401: bool,
    meta: LayoutMeta,
}

impl LayoutMetaBuilder {
    pub fn new(mapping: FieldMapping, raise_on_401: bool) -> Self {
        Self {
            mapping,
            raise_on_401,
            meta: LayoutMeta::default(),
        }
    }

    pub fn finish(self) -> LayoutMeta {
        self.meta
    }

    fn receive_field_control(&mut self, node: &Node) {
        let name = node.attribute("name").unwrap_or_default().to_string();
        let value_list_name = node
            .attribute("valuelist")
            .filter(|list| !list.is_empty())
            .map(str::to_string);
        let control = FieldControl {
            style: FieldStyle::from(node.attribute("type").unwrap_or_default()),
            value_list_name,
            name,
        };
        let key = self.mapping.logical(&control.name).to_lowercase();
        self.meta.field_controls.entry(key).or_default().push(control);
    }

    fn receive_value_list(&mut self, node: &Node) {
        let list = node.attribute("name").unwrap_or_default().to_string();
        let items = node
            .get("value")
            .into_iter()
            .flat_map(Node::items)
            .map(|item| {
                let value = item.text().unwrap_or_default().to_string();
                ValueListItem {
                    display: item
                        .attribute("display")
                        .map(str::to_string)
                        .unwrap_or_else(|| value.clone()),
                    value,
                    value_list_name: list.clone(),
                }
            })
            .collect();
        self.meta.value_lists.insert(list, items);
    }
}

impl Target for LayoutMetaBuilder {
    type Error = Error;

    fn before_close(&mut self, hook: &str, closed: &Closed<'_>) -> Result<(), Error> {
        trace!(hook, "layout metadata");
        match hook {
            "errorcode" => {
                let code = FileMakerError::parse_code(closed.node.text());
                FileMakerError::check(code, self.raise_on_401)?;
            }
            "layout" => {
                self.meta.database = closed.node.attribute("database").map(str::to_string);
                self.meta.layout = closed.node.attribute("name").map(str::to_string);
            }
            "field_control" => self.receive_field_control(closed.node),
            "value_list" => self.receive_value_list(closed.node),
            other => {
                return Err(filemaker_sax::SaxError::UnknownHook {
                    hook: other.to_string(),
                    tag: closed.tag.to_string(),
                }
                .into())
            }
        }
        Ok(())
    }
}

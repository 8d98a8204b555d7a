//! Declarative schema nodes describing how each XML tag is mapped.
//!
//! Templates are written as JSON documents. A template names the container
//! an element allocates, how that container (and its attributes and
//! children) attach to the enclosing object, an optional disambiguation key,
//! and the hooks fired while the element is open or once it closes.
//!
//! ```json
//! {
//!   "name": "record",
//!   "attach": "cursor",
//!   "before_close": "record",
//!   "elements": [
//!     { "name": "field", "delimiter": "name" }
//!   ]
//! }
//! ```

use {
    crate::error::{SaxError, SaxResult},
    indexmap::IndexMap,
    once_cell::sync::Lazy,
    serde::Deserialize,
    std::{fmt, str::FromStr},
};

/// Normalizes a tag or attribute name: lowercase, `-` replaced by `_`.
pub fn normalize(name: &str) -> String {
    name.replace('-', "_").to_lowercase()
}

/// Where a value goes when it is merged into its enclosing object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Attach {
    /// A container-local slot named by the label.
    Private,
    /// A pooled sub-container shared by every attachment of the object.
    /// `None` selects the default pool.
    Shared(Option<String>),
    /// Append to a list, or insert under the label of a keyed map.
    #[default]
    Default,
    /// Becomes the parsing cursor without attaching to the parent.
    Cursor,
    /// No container of its own; writes go to the enclosing object.
    Ignore,
}

impl Attach {
    /// Policies that do not produce a value to merge.
    pub fn is_detached(&self) -> bool {
        matches!(self, Attach::Cursor | Attach::Ignore)
    }
}

impl FromStr for Attach {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Attach::Private),
            "shared" => Ok(Attach::Shared(None)),
            "default" | "hash" | "array" | "values" => Ok(Attach::Default),
            "cursor" => Ok(Attach::Cursor),
            "none" => Ok(Attach::Ignore),
            pool if pool.starts_with('_') && pool.len() > 1 => {
                Ok(Attach::Shared(Some(normalize(&pool[1..]))))
            }
            other => Err(format!("unknown attach policy `{other}`")),
        }
    }
}

impl TryFrom<String> for Attach {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Attach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attach::Private => write!(f, "private"),
            Attach::Shared(None) => write!(f, "shared"),
            Attach::Shared(Some(pool)) => write!(f, "_{pool}"),
            Attach::Default => write!(f, "default"),
            Attach::Cursor => write!(f, "cursor"),
            Attach::Ignore => write!(f, "none"),
        }
    }
}

/// Container allocated for an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    #[default]
    #[serde(alias = "hash")]
    Keyed,
    #[serde(alias = "array")]
    List,
    /// Keyed storage whose default merges land in private slots.
    Object,
}

/// Which slots become readable through a node's keyed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accessor {
    All,
    Private,
    Shared,
    Hash,
    None,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawTemplate {
    name: Option<String>,
    elements: Vec<RawTemplate>,
    attributes: Vec<RawTemplate>,
    container: ContainerKind,
    attach: Option<Attach>,
    attach_elements: Option<Attach>,
    attach_attributes: Option<Attach>,
    as_name: Option<String>,
    delimiter: Option<String>,
    before_close: Option<String>,
    construct: Option<String>,
    create_accessors: Vec<Accessor>,
}

/// Immutable schema node for one tag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "RawTemplate")]
pub struct Template {
    name: Option<String>,
    elements: IndexMap<String, Template>,
    attributes: IndexMap<String, Template>,
    container: ContainerKind,
    attach: Option<Attach>,
    attach_elements: Option<Attach>,
    attach_attributes: Option<Attach>,
    as_name: Option<String>,
    delimiter: Option<String>,
    before_close: Option<String>,
    construct: Option<String>,
    create_accessors: Vec<Accessor>,
}

impl TryFrom<RawTemplate> for Template {
    type Error = String;

    fn try_from(raw: RawTemplate) -> Result<Self, Self::Error> {
        let owner = raw.name.clone().unwrap_or_else(|| "<root>".to_string());
        Ok(Template {
            elements: children(&owner, raw.elements)?,
            attributes: children(&owner, raw.attributes)?,
            name: raw.name.as_deref().map(normalize),
            container: raw.container,
            attach: raw.attach,
            attach_elements: raw.attach_elements,
            attach_attributes: raw.attach_attributes,
            as_name: raw.as_name.as_deref().map(normalize),
            delimiter: raw.delimiter.as_deref().map(normalize),
            before_close: raw.before_close,
            construct: raw.construct,
            create_accessors: raw.create_accessors,
        })
    }
}

fn children(owner: &str, raw: Vec<RawTemplate>) -> Result<IndexMap<String, Template>, String> {
    let mut out = IndexMap::with_capacity(raw.len());
    for child in raw {
        let name = child
            .name
            .as_deref()
            .map(normalize)
            .ok_or_else(|| format!("a child of `{owner}` has no name"))?;
        if out.contains_key(&name) {
            return Err(format!("`{owner}` declares `{name}` twice"));
        }
        out.insert(name, Template::try_from(child)?);
    }
    Ok(out)
}

static PERMISSIVE: Lazy<Template> = Lazy::new(Template::default);

impl Template {
    /// Parses a template from its JSON source.
    pub fn from_json(name: &str, source: &str) -> SaxResult<Self> {
        serde_json::from_str(source).map_err(|e| SaxError::invalid_template(name, e))
    }

    /// Schema used for tags no template declares: keyed map, default merge.
    pub fn permissive() -> &'static Template {
        &PERMISSIVE
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Child element schema, looked up by normalized tag.
    pub fn element(&self, tag: &str) -> Option<&Template> {
        self.elements.get(tag)
    }

    /// Attribute (or text) schema, looked up by normalized name.
    pub fn attribute(&self, name: &str) -> Option<&Template> {
        self.attributes.get(name)
    }

    pub fn container(&self) -> ContainerKind {
        self.container
    }

    pub fn attach(&self) -> Option<&Attach> {
        self.attach.as_ref()
    }

    pub fn attach_elements(&self) -> Option<&Attach> {
        self.attach_elements.as_ref()
    }

    pub fn attach_attributes(&self) -> Option<&Attach> {
        self.attach_attributes.as_ref()
    }

    pub fn as_name(&self) -> Option<&str> {
        self.as_name.as_deref()
    }

    pub fn delimiter(&self) -> Option<&str> {
        self.delimiter.as_deref()
    }

    pub fn before_close(&self) -> Option<&str> {
        self.before_close.as_deref()
    }

    pub fn construct(&self) -> Option<&str> {
        self.construct.as_deref()
    }

    /// Whether values attached with `attach` should be readable through keyed lookup.
    pub fn publishes(&self, attach: &Attach) -> bool {
        self.create_accessors.iter().any(|a| match (a, attach) {
            (Accessor::All, Attach::Private | Attach::Shared(_)) => true,
            (Accessor::Private, Attach::Private) => true,
            (Accessor::Shared | Accessor::Hash, Attach::Shared(_)) => true,
            _ => false,
        })
    }
}

//! The XML vocabularies the Web Publishing Engine answers with.

use {
    filemaker_sax::{Template, TemplateRegistry},
    once_cell::sync::Lazy,
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr, sync::Arc},
};

static TEMPLATES: Lazy<TemplateRegistry> = Lazy::new(|| {
    let registry = TemplateRegistry::new();
    registry.register("fmresultset", include_str!("../templates/fmresultset.json"));
    registry.register("fmpxmllayout", include_str!("../templates/fmpxmllayout.json"));
    registry.register("fmpxmlresult", include_str!("../templates/fmpxmlresult.json"));
    registry
});

/// Process-wide template registry holding the built-in grammars.
pub fn templates() -> &'static TemplateRegistry {
    &TEMPLATES
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Grammar {
    /// Records, field and portal metadata, counts.
    #[default]
    FmResultset,
    /// Field styles and value lists of a layout.
    FmpXmlLayout,
    /// Rows of columns; used for name lists.
    FmpXmlResult,
    /// Accepted in configuration; resolves to [`Grammar::FmResultset`].
    Auto,
}

impl Grammar {
    /// Path segment of `/fmi/xml/{segment}.xml`.
    pub fn path_segment(self) -> &'static str {
        match self.resolved() {
            Grammar::FmpXmlLayout => "FMPXMLLAYOUT",
            Grammar::FmpXmlResult => "FMPXMLRESULT",
            _ => "fmresultset",
        }
    }

    pub fn resolved(self) -> Grammar {
        match self {
            Grammar::Auto => Grammar::FmResultset,
            other => other,
        }
    }

    pub fn template_name(self) -> &'static str {
        match self.resolved() {
            Grammar::FmpXmlLayout => "fmpxmllayout",
            Grammar::FmpXmlResult => "fmpxmlresult",
            _ => "fmresultset",
        }
    }

    pub fn template(self) -> crate::Result<Arc<Template>> {
        Ok(templates().get(self.template_name())?)
    }
}

impl FromStr for Grammar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fmresultset" => Ok(Grammar::FmResultset),
            "fmpxmllayout" => Ok(Grammar::FmpXmlLayout),
            "fmpxmlresult" => Ok(Grammar::FmpXmlResult),
            "auto" => Ok(Grammar::Auto),
            other => Err(format!("unknown grammar `{other}`")),
        }
    }
}

impl TryFrom<String> for Grammar {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Grammar> for String {
    fn from(grammar: Grammar) -> Self {
        match grammar {
            Grammar::Auto => "auto".to_string(),
            other => other.path_segment().to_string(),
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from(*self))
    }
}

//! Named templates, parsed on first use and shared afterwards.

use {
    crate::{
        error::{SaxError, SaxResult},
        template::{normalize, Template},
    },
    dashmap::DashMap,
    std::sync::Arc,
    tracing::debug,
};

/// Registry of template sources and the templates loaded from them.
///
/// Sources are registered up front; a template is parsed the first time its
/// name is requested. Loading happens under the map entry's lock, so
/// concurrent first requests for one name parse it exactly once.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    sources: DashMap<String, Arc<str>>,
    loaded: DashMap<String, Arc<Template>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers JSON source for `name`, discarding any template already loaded under it.
    pub fn register(&self, name: &str, source: impl Into<Arc<str>>) {
        let name = normalize(name);
        self.loaded.remove(&name);
        self.sources.insert(name, source.into());
    }

    /// Inserts an already built template.
    pub fn insert(&self, name: &str, template: Template) -> Arc<Template> {
        let template = Arc::new(template);
        self.loaded.insert(normalize(name), Arc::clone(&template));
        template
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = normalize(name);
        self.loaded.contains_key(&name) || self.sources.contains_key(&name)
    }

    /// Returns the template for `name`, loading it from source on first use.
    pub fn get(&self, name: &str) -> SaxResult<Arc<Template>> {
        let name = normalize(name);
        if let Some(template) = self.loaded.get(&name) {
            return Ok(Arc::clone(template.value()));
        }

        let entry = self.loaded.entry(name.clone()).or_try_insert_with(|| {
            let source = self
                .sources
                .get(&name)
                .map(|source| Arc::clone(source.value()))
                .ok_or_else(|| SaxError::UnknownTemplate { name: name.clone() })?;
            let template = Template::from_json(&name, &source)?;
            debug!(template = %name, "loaded template");
            Ok::<_, SaxError>(Arc::new(template))
        })?;
        Ok(Arc::clone(entry.value()))
    }
}

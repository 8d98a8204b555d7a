//! Option layering.
//!
//! Every handle (server, database, layout) carries a partial [`Options`]. The
//! options a request runs with are the handle's chain layered together and
//! passed through a [`Resolve`] implementation, which applies base settings
//! and named override groups and fills in defaults.

use {
    crate::grammar::Grammar,
    indexmap::IndexMap,
    serde::{Deserialize, Serialize},
    std::{fmt::Debug, path::PathBuf, time::Duration},
    tracing::warn,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyOptions {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ProxyOptions {
    pub fn url(&self) -> String {
        match self.port {
            Some(port) => format!("http://{}:{}", self.host, port),
            None => format!("http://{}", self.host),
        }
    }
}

/// Partial settings; `None` means "inherit".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ssl: Option<bool>,
    /// Verify the server certificate. `false` trusts any certificate.
    pub root_cert: Option<bool>,
    /// PEM bundle added to the trusted roots.
    pub root_cert_path: Option<PathBuf>,
    pub account_name: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub layout: Option<String>,
    pub proxy: Option<ProxyOptions>,
    /// Seconds.
    pub timeout: Option<u64>,
    pub warn_on_redirect: Option<bool>,
    pub raise_on_401: Option<bool>,
    pub log_actions: Option<bool>,
    pub log_responses: Option<bool>,
    pub log_parser: Option<bool>,
    pub ignore_bad_data: Option<bool>,
    pub grammar: Option<Grammar>,
    /// `wire name -> logical name`.
    pub field_mapping: Option<IndexMap<String, String>>,
    pub redirect_limit: Option<u32>,
    /// Override groups applied, in order, on top of the base settings.
    #[serde(rename = "use")]
    pub use_groups: Vec<String>,
}

macro_rules! layer {
    ($top:expr, $parent:expr, $($field:ident),+ $(,)?) => {
        Options {
            $($field: $top.$field.clone().or_else(|| $parent.$field.clone()),)+
            use_groups: $parent
                .use_groups
                .iter()
                .chain($top.use_groups.iter())
                .fold(Vec::new(), |mut acc, group| {
                    if !acc.contains(group) {
                        acc.push(group.clone());
                    }
                    acc
                }),
        }
    };
}

impl Options {
    /// `self` layered over `parent`: settings present here win.
    pub fn over(&self, parent: &Options) -> Options {
        layer!(
            self,
            parent,
            host,
            port,
            ssl,
            root_cert,
            root_cert_path,
            account_name,
            password,
            database,
            layout,
            proxy,
            timeout,
            warn_on_redirect,
            raise_on_401,
            log_actions,
            log_responses,
            log_parser,
            ignore_bad_data,
            grammar,
            field_mapping,
            redirect_limit,
        )
    }

    pub fn database(name: impl Into<String>) -> Self {
        Options {
            database: Some(name.into()),
            ..Options::default()
        }
    }

    pub fn layout(name: impl Into<String>) -> Self {
        Options {
            layout: Some(name.into()),
            ..Options::default()
        }
    }
}

/// Fully resolved settings for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveOptions {
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    pub root_cert: bool,
    pub root_cert_path: Option<PathBuf>,
    pub account_name: String,
    pub password: String,
    pub database: Option<String>,
    pub layout: Option<String>,
    pub proxy: Option<ProxyOptions>,
    pub timeout: Duration,
    pub warn_on_redirect: bool,
    pub raise_on_401: bool,
    pub log_actions: bool,
    pub log_responses: bool,
    pub log_parser: bool,
    pub ignore_bad_data: bool,
    pub grammar: Grammar,
    pub field_mapping: IndexMap<String, String>,
    pub redirect_limit: u32,
}

impl From<Options> for EffectiveOptions {
    fn from(options: Options) -> Self {
        let ssl = options.ssl.unwrap_or(true);
        EffectiveOptions {
            host: options.host.unwrap_or_else(|| "localhost".to_string()),
            port: options.port.unwrap_or(if ssl { 443 } else { 80 }),
            ssl,
            root_cert: options.root_cert.unwrap_or(true),
            root_cert_path: options.root_cert_path,
            account_name: options.account_name.unwrap_or_default(),
            password: options.password.unwrap_or_default(),
            database: options.database,
            layout: options.layout,
            proxy: options.proxy,
            timeout: Duration::from_secs(options.timeout.unwrap_or(60)),
            warn_on_redirect: options.warn_on_redirect.unwrap_or(true),
            raise_on_401: options.raise_on_401.unwrap_or(false),
            log_actions: options.log_actions.unwrap_or(false),
            log_responses: options.log_responses.unwrap_or(false),
            log_parser: options.log_parser.unwrap_or(false),
            ignore_bad_data: options.ignore_bad_data.unwrap_or(false),
            grammar: options.grammar.unwrap_or_default().resolved(),
            field_mapping: options.field_mapping.unwrap_or_default(),
            redirect_limit: options.redirect_limit.unwrap_or(10),
        }
    }
}

impl EffectiveOptions {
    pub fn scheme(&self) -> &'static str {
        if self.ssl {
            "https"
        } else {
            "http"
        }
    }

    pub fn base_url(&self) -> crate::Result<url::Url> {
        Ok(url::Url::parse(&format!(
            "{}://{}:{}/",
            self.scheme(),
            self.host,
            self.port
        ))?)
    }
}

/// Turns the options local to a call site into the settings it runs with.
pub trait Resolve: Debug + Send + Sync {
    fn resolve(&self, local: &Options) -> EffectiveOptions;
}

/// Base settings plus named override groups.
///
/// Resolution starts from the base, applies every group named in the base's
/// and then the local `use` list, top-down, and finally the local options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigChain {
    pub base: Options,
    #[serde(rename = "profiles")]
    pub groups: IndexMap<String, Options>,
}

impl ConfigChain {
    pub fn new(base: Options) -> Self {
        Self {
            base,
            groups: IndexMap::new(),
        }
    }

    pub fn with_group(mut self, name: impl Into<String>, options: Options) -> Self {
        self.groups.insert(name.into(), options);
        self
    }

    /// The merged, unresolved options for `local`.
    pub fn layered(&self, local: &Options) -> Options {
        let mut merged = self.base.clone();
        let requested = self
            .base
            .use_groups
            .iter()
            .chain(local.use_groups.iter())
            .cloned()
            .collect::<Vec<_>>();
        for name in requested {
            match self.groups.get(&name) {
                Some(group) => merged = group.over(&merged),
                None => warn!(group = %name, "unknown override group"),
            }
        }
        local.over(&merged)
    }
}

impl Resolve for ConfigChain {
    fn resolve(&self, local: &Options) -> EffectiveOptions {
        self.layered(local).into()
    }
}

use {
    crate::{
        config::Options,
        grammar::Grammar,
        http::{Action, Params, RequestOptions},
        layout::Layout,
        names::NameListBuilder,
        server::Server,
        Result,
    },
    ::tracing::instrument,
};

/// A hosted database. Holds no connection state of its own.
#[derive(Debug, Clone)]
pub struct Database {
    server: Server,
    name: String,
    options: Options,
}

impl Database {
    pub(crate) fn new(server: Server, name: impl Into<String>, options: Options) -> Self {
        Self {
            server,
            name: name.into(),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// This database's options over the server's.
    pub fn layered(&self) -> Options {
        Options::database(&self.name).over(&self.options.over(self.server.options()))
    }

    pub fn layout(&self, name: impl Into<String>) -> Layout {
        self.layout_with(name, Options::default())
    }

    /// A layout handle carrying its own option overrides.
    pub fn layout_with(&self, name: impl Into<String>, options: Options) -> Layout {
        Layout::new(self.clone(), name, options)
    }

    #[instrument(name = "filemaker.database.layouts", skip(self), fields(database = %self.name), err)]
    pub async fn layouts(&self) -> Result<Vec<String>> {
        self.names(Action::LayoutNames).await
    }

    #[instrument(name = "filemaker.database.scripts", skip(self), fields(database = %self.name), err)]
    pub async fn scripts(&self) -> Result<Vec<String>> {
        self.names(Action::ScriptNames).await
    }

    async fn names(&self, action: Action) -> Result<Vec<String>> {
        let connection = self.server.connection(&self.layered());
        let builder = NameListBuilder::new(connection.options().raise_on_401);
        let request = RequestOptions::default().grammar(Grammar::FmpXmlResult);
        let params = Params::new().with("-db", self.name.as_str());
        let parsed = connection.execute(action, params, &request, builder).await?;
        Ok(parsed.target.finish())
    }
}

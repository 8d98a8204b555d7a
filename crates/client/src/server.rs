use {
    crate::{
        config::{ConfigChain, Options, Resolve},
        database::Database,
        grammar::Grammar,
        http::{Action, Connection, Params, RequestOptions},
        names::NameListBuilder,
        Result,
    },
    ::tracing::instrument,
    std::sync::Arc,
};

/// Root handle for one Web Publishing Engine host.
///
/// Options set here are the bottom layer of every database and layout handle
/// derived from it. The resolver is shared by all of them.
#[derive(Debug, Clone)]
pub struct Server {
    resolver: Arc<dyn Resolve>,
    options: Options,
}

impl Server {
    /// A server whose options resolve over library defaults only.
    pub fn new(options: Options) -> Self {
        Self::with_resolver(Arc::new(ConfigChain::default()), options)
    }

    pub fn with_resolver(resolver: Arc<dyn Resolve>, options: Options) -> Self {
        Self { resolver, options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn resolver(&self) -> &Arc<dyn Resolve> {
        &self.resolver
    }

    /// A connection for options already layered over this server's.
    pub fn connection(&self, layered: &Options) -> Connection {
        Connection::new(self.resolver.resolve(layered))
    }

    pub fn database(&self, name: impl Into<String>) -> Database {
        self.database_with(name, Options::default())
    }

    pub fn database_with(&self, name: impl Into<String>, options: Options) -> Database {
        Database::new(self.clone(), name, options)
    }

    /// Names of the databases the account can see.
    ///
    /// # Returns
    /// Database names in server order, from a `-dbnames` request.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use filemaker_client::{config::Options, Server};
    /// # async fn example() -> filemaker_client::Result<()> {
    /// let server = Server::new(Options {
    ///     host: Some("fm.example.com".into()),
    ///     ..Options::default()
    /// });
    /// for name in server.databases().await? {
    ///     println!("{name}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(name = "filemaker.server.databases", skip(self), err)]
    pub async fn databases(&self) -> Result<Vec<String>> {
        let connection = self.connection(&self.options);
        let builder = NameListBuilder::new(connection.options().raise_on_401);
        let request = RequestOptions::default().grammar(Grammar::FmpXmlResult);
        let parsed = connection
            .execute(Action::DbNames, Params::new(), &request, builder)
            .await?;
        Ok(parsed.target.finish())
    }
}

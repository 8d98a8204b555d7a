//! Layout handle: the entry point for record operations.

use {
    crate::{
        config::Options,
        database::Database,
        grammar::Grammar,
        http::{Action, Connection, Params, RequestOptions},
        metadata::{LayoutMeta, LayoutMetaBuilder, ValueListItem},
        query::FindCriteria,
        record::Record,
        resultset::{Resultset, ResultsetBuilder, Schema},
        Error, Result,
    },
    ::tracing::{debug, instrument},
    indexmap::IndexMap,
    std::sync::Arc,
    tokio::sync::OnceCell,
};

/// A named layout of a database.
///
/// Handles are cheap to clone; clones share the cached field schema and
/// layout metadata.
#[derive(Debug, Clone)]
pub struct Layout {
    database: Database,
    name: String,
    options: Options,
    schema: Arc<OnceCell<Arc<Schema>>>,
    meta: Arc<OnceCell<Arc<LayoutMeta>>>,
}

impl Layout {
    pub(crate) fn new(database: Database, name: impl Into<String>, options: Options) -> Self {
        Self {
            database,
            name: name.into(),
            options,
            schema: Arc::default(),
            meta: Arc::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Options set on this handle only.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// This layout's options over its database's and server's.
    pub fn layered(&self) -> Options {
        Options::layout(&self.name).over(&self.options.over(&self.database.layered()))
    }

    pub fn connection(&self) -> Connection {
        self.database.server().connection(&self.layered())
    }

    fn target(&self) -> Params {
        Params::new()
            .with("-db", self.database.name())
            .with("-lay", self.name.as_str())
    }

    async fn get_records(
        &self,
        action: Action,
        params: Params,
        request: RequestOptions,
    ) -> Result<Resultset> {
        let connection = self.connection();
        let options = connection.options();
        let builder = ResultsetBuilder::new(
            connection.field_mapping(),
            options.raise_on_401,
            options.ignore_bad_data,
        )
        .for_layout(self.clone());

        let mut form = self.target();
        form.extend(params);
        let request = RequestOptions {
            grammar: Some(Grammar::FmResultset),
            ..request
        };
        let resultset = connection
            .execute(action, form, &request, builder)
            .await?
            .target
            .finish();

        let cacheable = *resultset.meta().error_code() != 401;
        if cacheable && self.schema.set(Arc::clone(resultset.schema())).is_ok() {
            debug!(layout = %self.name, "cached field schema");
        }
        Ok(resultset)
    }

    /// Field names in `values` go through the field mapping.
    fn outgoing(&self, values: Params) -> Params {
        let mapping = self.connection().field_mapping();
        values.map_keys(|key| mapping.wire(key).to_string())
    }

    #[instrument(name = "filemaker.layout.all", skip(self, request), fields(layout = %self.name), err)]
    #[pseudonym::alias(find_all)]
    pub async fn all(&self, request: RequestOptions) -> Result<Resultset> {
        self.get_records(Action::FindAll, Params::new(), request).await
    }

    /// One random record.
    #[instrument(name = "filemaker.layout.any", skip(self, request), fields(layout = %self.name), err)]
    #[pseudonym::alias(find_any)]
    pub async fn any(&self, request: RequestOptions) -> Result<Resultset> {
        self.get_records(Action::FindAny, Params::new(), request).await
    }

    /// Finds records by id, by one request, or by a compound of requests.
    ///
    /// A single request with one value per field goes out as a plain
    /// `-find`; value lists and omitted requests become a `-findquery`.
    /// "No records found" yields an empty result unless `raise_on_401` is set.
    ///
    /// # Arguments
    /// * `criteria` - A record id, a [`FindRequest`](crate::query::FindRequest), or a list of them
    /// * `request` - Paging, sorting and script options
    ///
    /// # Example
    /// ```rust,no_run
    /// # use filemaker_client::{config::Options, query::FindRequest, RequestOptions, Server};
    /// # async fn example() -> filemaker_client::Result<()> {
    /// let people = Server::new(Options::default()).database("Contacts").layout("People");
    /// let found = people
    ///     .find(
    ///         vec![
    ///             FindRequest::new().field("city", ["Oslo", "Bergen"]),
    ///             FindRequest::new().field("status", "Inactive").omit(),
    ///         ],
    ///         RequestOptions::default().max_records(50),
    ///     )
    ///     .await?;
    /// println!("{} of {}", found.len(), found.foundset_count());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(
        name = "filemaker.layout.find",
        skip(self, criteria, request),
        fields(layout = %self.name),
        err
    )]
    pub async fn find(
        &self,
        criteria: impl Into<FindCriteria>,
        request: RequestOptions,
    ) -> Result<Resultset> {
        let query = criteria
            .into()
            .build(&self.connection().field_mapping());
        self.get_records(query.action, query.params, request).await
    }

    /// `-findquery` with caller-built `-q{n}` and `-query` parameters.
    #[instrument(name = "filemaker.layout.query", skip(self, params, request), fields(layout = %self.name), err)]
    pub async fn query(&self, params: Params, request: RequestOptions) -> Result<Resultset> {
        self.get_records(Action::FindQuery, params, request).await
    }

    /// Writes `values` to the record with `record_id`.
    ///
    /// # Arguments
    /// * `record_id` - Server record id (`-recid`)
    /// * `values` - Field values by logical name; repeated values fill repetitions
    /// * `request` - Set `modification_id` to reject the edit when the record changed
    ///
    /// # Returns
    /// The edited record as the server now holds it.
    #[instrument(
        name = "filemaker.layout.edit",
        skip(self, values, request),
        fields(layout = %self.name, record_id = %record_id),
        err
    )]
    pub async fn edit(
        &self,
        record_id: &str,
        values: Params,
        request: RequestOptions,
    ) -> Result<Resultset> {
        let params = self.outgoing(values).with("-recid", record_id);
        self.get_records(Action::Edit, params, request).await
    }

    /// Creates a record from `values`.
    ///
    /// # Returns
    /// The new record, including auto-entered values and its record id.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use filemaker_client::{config::Options, Params, RequestOptions, Server};
    /// # async fn example() -> filemaker_client::Result<()> {
    /// let people = Server::new(Options::default()).database("Contacts").layout("People");
    /// let values = Params::new()
    ///     .with("first", "Bill")
    ///     .with("phone", vec!["555-0100".to_string(), "555-0199".to_string()]);
    /// let created = people.create(values, RequestOptions::default()).await?;
    /// println!("{:?}", created.records()[0].record_id());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(name = "filemaker.layout.create", skip(self, values, request), fields(layout = %self.name), err)]
    pub async fn create(&self, values: Params, request: RequestOptions) -> Result<Resultset> {
        let params = self.outgoing(values);
        self.get_records(Action::New, params, request).await
    }

    #[instrument(
        name = "filemaker.layout.delete",
        skip(self, request),
        fields(layout = %self.name, record_id = %record_id),
        err
    )]
    pub async fn delete(&self, record_id: &str, request: RequestOptions) -> Result<()> {
        let params = Params::new().with("-recid", record_id);
        self.get_records(Action::Delete, params, request).await?;
        Ok(())
    }

    /// Layout metadata and counts, without records.
    #[instrument(name = "filemaker.layout.view", skip(self, request), fields(layout = %self.name), err)]
    pub async fn view(&self, request: RequestOptions) -> Result<Resultset> {
        self.get_records(Action::View, Params::new(), request).await
    }

    /// Size of the found set for `criteria`, fetching no records.
    ///
    /// Sends the find with `-max=0`, so only the counts come back.
    ///
    /// # Returns
    /// The found-set count, `0` when nothing matches.
    #[instrument(name = "filemaker.layout.count", skip(self, criteria), fields(layout = %self.name), err)]
    pub async fn count(&self, criteria: impl Into<FindCriteria>) -> Result<usize> {
        let found = self
            .find(criteria, RequestOptions::default().max_records(0))
            .await?;
        Ok(found.foundset_count())
    }

    /// Records in the layout's table.
    pub async fn total_count(&self) -> Result<usize> {
        Ok(self.view(RequestOptions::default()).await?.total_count())
    }

    /// Field controls and value lists, read with the layout grammar.
    ///
    /// Fetched once per handle family; clones of this handle share the
    /// result, a fresh [`Database::layout`] handle fetches again.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use filemaker_client::{config::Options, Server};
    /// # async fn example() -> filemaker_client::Result<()> {
    /// let people = Server::new(Options::default()).database("Contacts").layout("People");
    /// let meta = people.meta().await?;
    /// for item in meta.value_list("Statuses").unwrap_or_default() {
    ///     println!("{}", item.display());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(name = "filemaker.layout.meta", skip(self), fields(layout = %self.name), err)]
    pub async fn meta(&self) -> Result<Arc<LayoutMeta>> {
        self.meta
            .get_or_try_init(|| async {
                let connection = self.connection();
                let builder = LayoutMetaBuilder::new(
                    connection.field_mapping(),
                    connection.options().raise_on_401,
                );
                let request = RequestOptions::default().grammar(Grammar::FmpXmlLayout);
                let parsed = connection
                    .execute(Action::View, self.target(), &request, builder)
                    .await?;
                Ok::<_, Error>(Arc::new(parsed.target.finish()))
            })
            .await
            .cloned()
    }

    /// Field schema of the layout, from the last record response or a `-view`.
    pub async fn schema(&self) -> Result<Arc<Schema>> {
        self.schema
            .get_or_try_init(|| async {
                let view = self.view(RequestOptions::default()).await?;
                Ok::<_, Error>(Arc::clone(view.schema()))
            })
            .await
            .cloned()
    }

    pub async fn field_names(&self) -> Result<Vec<String>> {
        let meta = self.meta().await?;
        Ok(meta.field_names().into_iter().map(str::to_string).collect())
    }

    pub async fn value_lists(&self) -> Result<IndexMap<String, Vec<ValueListItem>>> {
        Ok(self.meta().await?.value_lists().clone())
    }

    /// An unsaved record bound to this layout, every known field null.
    pub async fn new_record(&self) -> Result<Record> {
        Ok(Record::new(self.schema().await?, Some(self.clone())))
    }
}

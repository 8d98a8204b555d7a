//! One request/response exchange with the Web Publishing Engine.

use {
    super::{Action, Params, RequestOptions},
    crate::{
        config::EffectiveOptions, grammar::Grammar, mapping::FieldMapping, Error, Result,
    },
    ::tracing::{debug, error, info, instrument, warn},
    filemaker_sax::{Graph, Node, Parsed, Target, Template},
    reqwest::{header::LOCATION, redirect::Policy, Certificate, Client, Proxy, StatusCode},
    tap::TapFallible,
    url::Url,
};

/// Posts requests with a fixed set of resolved options.
///
/// The HTTP client is built per call from the options, so TLS, proxy and
/// timeout settings are never cached across calls.
#[derive(Debug, Clone)]
pub struct Connection {
    options: EffectiveOptions,
}

impl Connection {
    pub fn new(options: EffectiveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EffectiveOptions {
        &self.options
    }

    pub fn field_mapping(&self) -> FieldMapping {
        FieldMapping::new(&self.options.field_mapping)
    }

    /// `{scheme}://{host}:{port}/fmi/xml/{grammar}.xml`
    pub fn url(&self, grammar: Grammar) -> Result<Url> {
        Ok(self
            .options
            .base_url()?
            .join(&format!("fmi/xml/{}.xml", grammar.path_segment()))?)
    }

    /// Grammar a request runs with: its own, else the configured default.
    pub fn grammar(&self, request: &RequestOptions) -> Grammar {
        request.grammar.unwrap_or(self.options.grammar).resolved()
    }

    /// Runs `action` and maps the response body onto `target` using the
    /// grammar's template.
    ///
    /// # Arguments
    /// * `action` - the action token sent last in the form body
    /// * `params` - action parameters, field names already on the wire
    /// * `request` - per-request options expanded into parameters
    /// * `target` - receives the grammar's lifecycle hooks
    #[instrument(
        name = "filemaker.connection.execute",
        skip(self, params, request, target),
        fields(
            action = %action,
            host = %self.options.host,
            database = ?self.options.database,
        ),
        err
    )]
    pub async fn execute<T>(
        &self,
        action: Action,
        params: Params,
        request: &RequestOptions,
        target: T,
    ) -> Result<Parsed<T>>
    where
        T: Target,
        Error: From<T::Error>,
    {
        let grammar = self.grammar(request);
        let template = grammar.template()?;
        let body = self.exchange(action, params, request, grammar).await?;

        if self.options.log_parser {
            info!(template = grammar.template_name(), bytes = body.len(), "parsing response");
        }
        filemaker_sax::parse(&body, &template, target)
            .map_err(Error::from)
            .tap_err(|e| error!("could not map {} response: {}", grammar, e))
    }

    /// Runs `action` and returns the response as a generic node graph.
    #[instrument(
        name = "filemaker.connection.execute_raw",
        skip(self, params, request),
        fields(action = %action),
        err
    )]
    pub async fn execute_raw(
        &self,
        action: Action,
        params: Params,
        request: &RequestOptions,
    ) -> Result<Node> {
        let grammar = self.grammar(request);
        let body = self.exchange(action, params, request, grammar).await?;
        Ok(filemaker_sax::parse(&body, Template::permissive(), Graph)?.root)
    }

    async fn exchange(
        &self,
        action: Action,
        mut params: Params,
        request: &RequestOptions,
        grammar: Grammar,
    ) -> Result<Vec<u8>> {
        params.extend(request.expand(&self.field_mapping())?);
        params.insert(action.token(), "");
        let url = self.url(grammar)?;

        if self.options.log_actions {
            info!("POST {} {}", url, params);
        }
        self.post(url, &params.to_form()).await
    }

    fn client(&self, root_cert: Option<Certificate>) -> Result<Client> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .timeout(self.options.timeout);
        if !self.options.root_cert {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(cert) = root_cert {
            builder = builder.add_root_certificate(cert);
        }
        if let Some(proxy) = &self.options.proxy {
            let mut configured = Proxy::all(proxy.url())?;
            if let Some(user) = &proxy.user {
                configured = configured.basic_auth(user, proxy.password.as_deref().unwrap_or(""));
            }
            builder = builder.proxy(configured);
        }
        Ok(builder.build()?)
    }

    async fn root_certificate(&self) -> Result<Option<Certificate>> {
        let Some(path) = &self.options.root_cert_path else {
            return Ok(None);
        };
        let pem = tokio::fs::read(path)
            .await
            .map_err(|source| Error::Certificate {
                path: path.clone(),
                source,
            })?;
        Ok(Some(Certificate::from_pem(&pem)?))
    }

    /// Posts `form` to `url`, following redirects while the hop budget lasts.
    async fn post(&self, mut url: Url, form: &[(String, String)]) -> Result<Vec<u8>> {
        let client = self.client(self.root_certificate().await?)?;
        let mut hops = self.options.redirect_limit;

        loop {
            debug!("post uri: {}", &url);
            let response = client
                .post(url.clone())
                .basic_auth(&self.options.account_name, Some(&self.options.password))
                .form(form)
                .send()
                .await
                .tap_err(|e| error!("error on request.send(): {:?}", e))?;
            let status = response.status();

            if self.options.log_responses {
                info!(status = %status, headers = ?response.headers(), "response");
            }

            if status.is_redirection() {
                if hops == 0 {
                    return Err(Error::RedirectLimit {
                        limit: self.options.redirect_limit,
                    });
                }
                hops -= 1;
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| communication(status))?;
                let next = url.join(location)?;
                if self.options.warn_on_redirect {
                    warn!(from = %url, to = %next, "redirected by the server");
                }
                url = next;
                continue;
            }

            match status.as_u16() {
                401 => {
                    return Err(Error::Authentication {
                        account: self.options.account_name.clone(),
                    })
                }
                404 => return Err(Error::ServiceUnavailable),
                _ if !status.is_success() => return Err(communication(status)),
                _ => {}
            }

            let body = response.bytes().await?;
            if self.options.log_responses {
                info!(body = %String::from_utf8_lossy(&body), "response body");
            }
            return Ok(body.to_vec());
        }
    }
}

fn communication(status: StatusCode) -> Error {
    Error::Communication {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}

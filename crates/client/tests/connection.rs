use {
    axum::{
        extract::{Path, State},
        http::{header, HeaderMap, StatusCode, Uri},
        response::{IntoResponse, Redirect, Response},
        routing::post,
        Form, Router,
    },
    filemaker_client::{
        config::Options,
        query::FindRequest,
        Action, Error, Params, RequestOptions, Server, Value,
    },
    indexmap::IndexMap,
    pretty_assertions::assert_eq,
    std::{
        net::SocketAddr,
        sync::{Arc, Mutex},
    },
};

const CONTACTS: &str = include_str!("fixtures/contacts.xml");
const NO_RECORDS: &str = include_str!("fixtures/no_records.xml");
const LAYOUT: &str = include_str!("fixtures/layout.xml");
const NAMES: &str = include_str!("fixtures/names.xml");

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    authorization: Option<String>,
    form: Vec<(String, String)>,
}

impl Seen {
    fn has(&self, key: &str, value: &str) -> bool {
        self.form.iter().any(|(k, v)| k == key && v == value)
    }

    fn action(&self) -> &str {
        self.form.last().map(|(k, _)| k.as_str()).unwrap_or_default()
    }
}

#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<Seen>>>,
    records_body: Option<&'static str>,
    redirects: u32,
}

impl Recorder {
    fn last(&self) -> Seen {
        self.seen.lock().unwrap().last().cloned().expect("no request seen")
    }
}

fn xml(body: &'static str) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

async fn grammar(
    State(recorder): State<Recorder>,
    uri: Uri,
    headers: HeaderMap,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    recorder.seen.lock().unwrap().push(Seen {
        path: uri.path().to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        form,
    });
    match uri.path() {
        "/fmi/xml/FMPXMLLAYOUT.xml" => xml(LAYOUT),
        "/fmi/xml/FMPXMLRESULT.xml" => xml(NAMES),
        _ if recorder.redirects > 0 => Redirect::temporary("/hop/1").into_response(),
        _ => xml(recorder.records_body.unwrap_or(CONTACTS)),
    }
}

async fn hop(State(recorder): State<Recorder>, Path(n): Path<u32>) -> Response {
    if n < recorder.redirects {
        Redirect::temporary(&format!("/hop/{}", n + 1)).into_response()
    } else {
        xml(CONTACTS)
    }
}

async fn spawn(app: Router) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(addr)
}

async fn start(recorder: Recorder) -> anyhow::Result<SocketAddr> {
    let app = Router::new()
        .route("/fmi/xml/:grammar", post(grammar))
        .route("/hop/:n", post(hop))
        .with_state(recorder);
    spawn(app).await
}

fn options(addr: SocketAddr) -> Options {
    Options {
        host: Some(addr.ip().to_string()),
        port: Some(addr.port()),
        ssl: Some(false),
        account_name: Some("web".into()),
        password: Some("pw".into()),
        warn_on_redirect: Some(false),
        field_mapping: Some(IndexMap::from([(
            "Name First".to_string(),
            "first".to_string(),
        )])),
        ..Options::default()
    }
}

async fn status_server(status: StatusCode) -> anyhow::Result<SocketAddr> {
    spawn(Router::new().route("/fmi/xml/fmresultset.xml", post(move || async move { status }))).await
}

#[tokio::test]
async fn find_all_posts_target_options_and_action_last() -> anyhow::Result<()> {
    let recorder = Recorder::default();
    let addr = start(recorder.clone()).await?;
    let layout = Server::new(options(addr)).database("Contacts").layout("Web");

    let found = layout.all(RequestOptions::default().max_records(5)).await?;
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].get("first")?, &Value::from("Bill"));

    let seen = recorder.last();
    assert_eq!(seen.path, "/fmi/xml/fmresultset.xml");
    assert_eq!(seen.authorization.as_deref(), Some("Basic d2ViOnB3"));
    assert!(seen.has("-db", "Contacts"));
    assert!(seen.has("-lay", "Web"));
    assert!(seen.has("-max", "5"));
    assert_eq!(seen.action(), "-findall");
    Ok(())
}

#[tokio::test]
async fn or_values_become_a_find_query() -> anyhow::Result<()> {
    let recorder = Recorder::default();
    let addr = start(recorder.clone()).await?;
    let layout = Server::new(options(addr)).database("Contacts").layout("Web");

    layout
        .find(
            FindRequest::new().field("first", ["Bill", "Will"]).field("dept", "Sales"),
            RequestOptions::default(),
        )
        .await?;

    let seen = recorder.last();
    assert!(seen.has("-q0", "Name First"));
    assert!(seen.has("-q1.value", "Will"));
    assert!(seen.has("-q2", "dept"));
    assert!(seen.has("-query", "(q0,q2);(q1,q2)"));
    assert_eq!(seen.action(), "-findquery");
    Ok(())
}

#[tokio::test]
async fn redirects_follow_until_the_budget_runs_out() -> anyhow::Result<()> {
    let addr = start(Recorder {
        redirects: 3,
        ..Recorder::default()
    })
    .await?;
    let layout = Server::new(options(addr)).database("Contacts").layout("Web");
    assert_eq!(layout.all(RequestOptions::default()).await?.len(), 2);

    let addr = start(Recorder {
        redirects: 11,
        ..Recorder::default()
    })
    .await?;
    let layout = Server::new(options(addr)).database("Contacts").layout("Web");
    let err = layout.all(RequestOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::RedirectLimit { limit: 10 }), "{err}");
    Ok(())
}

#[tokio::test]
async fn http_statuses_map_to_transport_errors() -> anyhow::Result<()> {
    let layout = |addr| Server::new(options(addr)).database("Contacts").layout("Web");

    let err = layout(status_server(StatusCode::UNAUTHORIZED).await?)
        .all(RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Authentication { ref account } if account == "web"));

    let err = layout(status_server(StatusCode::INTERNAL_SERVER_ERROR).await?)
        .all(RequestOptions::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Communication { status: 500, ref reason } if reason == "Internal Server Error")
    );

    let addr = spawn(Router::new()).await?;
    let err = layout(addr).all(RequestOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable));
    Ok(())
}

#[tokio::test]
async fn no_records_found_is_empty_unless_raised() -> anyhow::Result<()> {
    let addr = start(Recorder {
        records_body: Some(NO_RECORDS),
        ..Recorder::default()
    })
    .await?;
    let server = Server::new(options(addr));

    let found = server
        .database("Contacts")
        .layout("Web")
        .find(FindRequest::new().field("first", "Nobody"), RequestOptions::default())
        .await?;
    assert!(found.is_empty());

    let strict = server.database("Contacts").layout_with(
        "Web",
        Options {
            raise_on_401: Some(true),
            ..Options::default()
        },
    );
    let err = strict
        .find(FindRequest::new().field("first", "Nobody"), RequestOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_no_records_found());
    Ok(())
}

#[tokio::test]
async fn saving_sends_mapped_edits_and_reloads() -> anyhow::Result<()> {
    let recorder = Recorder::default();
    let addr = start(recorder.clone()).await?;
    let layout = Server::new(options(addr)).database("Contacts").layout("Web");

    let mut bill = layout.all(RequestOptions::default()).await?.into_records().remove(0);
    bill.set("First", "Billy")?;
    assert_eq!(bill.get("first")?, &Value::from("Billy"));
    bill.save_if_not_modified().await?;

    let seen = recorder.last();
    assert!(seen.has("Name First", "Billy"));
    assert!(seen.has("-recid", "1"));
    assert!(seen.has("-modid", "7"));
    assert_eq!(seen.action(), "-edit");

    assert!(bill.mods().is_empty());
    assert_eq!(bill.get("first")?, &Value::from("Bill"));
    Ok(())
}

#[tokio::test]
async fn new_records_create_and_reject_unknown_fields() -> anyhow::Result<()> {
    let recorder = Recorder::default();
    let addr = start(recorder.clone()).await?;
    let layout = Server::new(options(addr)).database("Contacts").layout("Web");

    let mut record = layout.new_record().await?;
    assert_eq!(recorder.last().action(), "-view");
    assert!(record.record_id().is_none());
    assert_eq!(record.get("salary")?, &Value::Null);

    assert!(matches!(record.set("nickname", "B"), Err(Error::FieldNotFound { .. })));
    assert!(record.mods().is_empty());

    record.set("phone", vec!["555-0100", "555-0101"])?;
    record.save().await?;
    let seen = recorder.last();
    assert_eq!(seen.action(), "-new");
    assert!(seen.has("phone(1)", "555-0100"));
    assert!(seen.has("phone(2)", "555-0101"));
    assert_eq!(record.record_id(), Some("1"));
    Ok(())
}

#[tokio::test]
async fn destroyed_records_refuse_writes() -> anyhow::Result<()> {
    let recorder = Recorder::default();
    let addr = start(recorder.clone()).await?;
    let layout = Server::new(options(addr)).database("Contacts").layout("Web");

    let mut bill = layout.all(RequestOptions::default()).await?.into_records().remove(0);
    bill.destroy().await?;
    let seen = recorder.last();
    assert_eq!(seen.action(), "-delete");
    assert!(seen.has("-recid", "1"));

    assert!(bill.is_deleted());
    assert!(matches!(bill.set("first", "Ghost"), Err(Error::Parameter(_))));
    Ok(())
}

#[tokio::test]
async fn layout_meta_is_fetched_once() -> anyhow::Result<()> {
    let recorder = Recorder::default();
    let addr = start(recorder.clone()).await?;
    let layout = Server::new(options(addr)).database("Contacts").layout("Web");

    let names = layout.field_names().await?;
    assert_eq!(names, vec!["Name First", "Status", "Notes", "Badge"]);
    let lists = layout.clone().value_lists().await?;
    assert_eq!(lists["Statuses"].len(), 2);

    let seen = recorder.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/fmi/xml/FMPXMLLAYOUT.xml");
    assert_eq!(seen[0].action(), "-view");
    Ok(())
}

#[tokio::test]
async fn name_lists_enumerate_databases_layouts_and_scripts() -> anyhow::Result<()> {
    let recorder = Recorder::default();
    let addr = start(recorder.clone()).await?;
    let server = Server::new(options(addr));

    assert_eq!(server.databases().await?, vec!["Contacts", "Inventory"]);
    assert_eq!(recorder.last().action(), "-dbnames");

    let database = server.database("Contacts");
    database.layouts().await?;
    let seen = recorder.last();
    assert_eq!(seen.path, "/fmi/xml/FMPXMLRESULT.xml");
    assert!(seen.has("-db", "Contacts"));
    assert_eq!(seen.action(), "-layoutnames");

    database.scripts().await?;
    assert_eq!(recorder.last().action(), "-scriptnames");
    Ok(())
}

#[tokio::test]
async fn count_fetches_no_records() -> anyhow::Result<()> {
    let recorder = Recorder::default();
    let addr = start(recorder.clone()).await?;
    let layout = Server::new(options(addr)).database("Contacts").layout("Web");

    assert_eq!(layout.count(FindRequest::new().field("first", "Bill")).await?, 2);
    let seen = recorder.last();
    assert!(seen.has("-max", "0"));
    assert!(seen.has("Name First", "Bill"));
    assert_eq!(seen.action(), "-find");

    assert_eq!(layout.total_count().await?, 3);
    Ok(())
}

#[tokio::test]
async fn raw_requests_return_the_generic_graph() -> anyhow::Result<()> {
    let recorder = Recorder::default();
    let addr = start(recorder.clone()).await?;
    let layout = Server::new(options(addr)).database("Contacts").layout("Web");

    let params = Params::new().with("-db", "Contacts").with("-lay", "Web");
    let root = layout
        .connection()
        .execute_raw(Action::View, params, &RequestOptions::default())
        .await?;
    assert!(root.get("fmresultset").is_some());
    assert_eq!(recorder.last().action(), "-view");
    Ok(())
}

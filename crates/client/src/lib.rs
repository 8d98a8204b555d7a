//! Client for the FileMaker XML Web Publishing Engine.
//!
//! A [`Server`] hands out [`Database`] handles, which hand out [`Layout`]
//! handles. Layouts run the record actions (`-findall`, `-find`,
//! `-findquery`, `-new`, `-edit`, `-delete`, `-view`) and return a
//! [`Resultset`] of [`Record`]s whose values are typed by the layout's field
//! definitions.
//!
//! ```no_run
//! use filemaker_client::{config::Options, query::FindRequest, RequestOptions, Server};
//!
//! # async fn run() -> filemaker_client::Result<()> {
//! let server = Server::new(Options {
//!     host: Some("fm.example.com".into()),
//!     account_name: Some("web".into()),
//!     password: Some("secret".into()),
//!     ..Options::default()
//! });
//! let people = server.database("Contacts").layout("People");
//! let found = people
//!     .find(FindRequest::new().field("city", ["Oslo", "Bergen"]), RequestOptions::default())
//!     .await?;
//! for record in &found {
//!     println!("{:?}", record.get("name")?);
//! }
//! # Ok(())
//! # }
//! ```

pub use {
    config::{ConfigChain, EffectiveOptions, Options, Resolve},
    database::Database,
    err::{classify, Error, ErrorKind, FileMakerError, Result},
    grammar::Grammar,
    http::{Action, Connection, ParamValue, Params, RequestOptions, Script, SortOrder},
    layout::Layout,
    mapping::FieldMapping,
    record::Record,
    resultset::{Product, Resultset, ResultsetBuilder, ResultsetMeta, Schema},
    server::Server,
    value::{Formats, Value},
};

pub mod config;
mod database;
mod err;
pub mod grammar;
pub mod http;
mod layout;
mod mapping;
pub mod metadata;
pub mod names;
pub mod query;
mod record;
mod resultset;
mod server;
mod value;

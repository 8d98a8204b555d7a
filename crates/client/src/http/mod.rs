//! The HTTP side of the client: actions, parameters, request options and
//! the connection that posts them.

mod action;
mod connection;
mod options;
mod params;

pub use {
    action::Action,
    connection::Connection,
    options::{LogicalOperator, RequestOptions, Script, SortOrder, MAX_SORT_FIELDS},
    params::{ParamValue, Params},
};

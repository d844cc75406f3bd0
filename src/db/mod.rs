//! Database access for models.
//!
//! This module provides the query layer used by models and libraries:
//! - [`Database`]: fluent builder that compiles and runs one statement per
//!   terminal call over a lazily opened connection
//! - [`Statement`]: tagged statement variants and their SQL compilation
//! - [`Connector`] / [`Connection`]: the driver seam, implemented for
//!   PostgreSQL and for an in-process recording driver
//!
//! # Value handling
//!
//! Values given to `where_eq`, `insert` and `update` are strings. By default
//! they are sent as bound parameters ([`ValueMode::Bound`]). The original
//! framework interpolated them between single quotes without escaping; that
//! output is still available as [`ValueMode::Verbatim`] for compatibility
//! checks, and [`ValueMode::Escaped`] inlines quote-doubled literals.

mod backend;
mod config;
mod database;
mod escape;
pub mod postgres;
pub mod recording;
mod result;
pub mod statement;

pub use backend::{Connection, Connector, QueryResult};
pub use config::{DB_SECTION, DatabaseConfig};
pub use database::{Database, QueryState};
pub use escape::{escape_literal, quote_literal, quote_verbatim};
pub use self::postgres::PostgresConnector;
pub use recording::RecordingConnector;
pub use result::{ResultSet, Row};
pub use statement::{CompiledStatement, Condition, Fields, Statement, StatementKind, ValueMode};

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Couldn't connect to the database: {message}")]
    ConnectionFailed { message: String },

    #[error("Not connected; call connect() first")]
    NotConnected,

    #[error("{kind} needs a table; call from() first")]
    MissingTable { kind: &'static str },

    #[error("Query failed: {message}")]
    QueryFailed { message: String },

    #[error("Failed to decode row: {message}")]
    Decode { message: String },

    #[error("Cannot bind '{value}' as {type_name}")]
    UnsupportedParameter { type_name: String, value: String },
}

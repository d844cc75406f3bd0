//! Fluent query builder over one lazily opened connection.
//!
//! `from` and `where_*` calls accumulate a [`QueryState`]. A terminal call
//! (`select`, `insert`, `insert_values`, `update`, `delete`, `create_table`,
//! `create_database`) takes that state, compiles exactly one statement, runs
//! it, and leaves the builder empty again whether or not the statement
//! succeeded. The rows it produced are then read through the result
//! accessors:
//!
//! ```ignore
//! let adults: Vec<Person> = db
//!     .from("people")
//!     .where_eq("city", "NY")
//!     .select("*")?
//!     .result_objects()?;
//! ```

use std::fmt::Display;
use std::sync::Arc;

use super::DbError;
use super::backend::{Connection, Connector};
use super::config::DatabaseConfig;
use super::result::{ResultSet, Row};
use super::statement::{
    CompiledStatement, Condition, CreateDatabase, CreateTable, Delete, Fields, Insert, Select,
    Statement, Update, ValueMode,
};
use serde::de::DeserializeOwned;

/// Table and predicates gathered for the next terminal call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    table: Option<String>,
    conditions: Vec<Condition>,
}

impl QueryState {
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_none() && self.conditions.is_empty()
    }
}

enum ConnectionState {
    Idle,
    Connected(Box<dyn Connection>),
    /// A failed handshake poisons the instance; there is no retry.
    Failed(String),
}

pub struct Database {
    settings: DatabaseConfig,
    connector: Arc<dyn Connector>,
    connection: ConnectionState,
    mode: ValueMode,
    pending: QueryState,
    result: ResultSet,
    last: Option<CompiledStatement>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.connector.backend_name())
            .field("connected", &self.is_connected())
            .field("mode", &self.mode)
            .field("pending", &self.pending)
            .finish()
    }
}

impl Database {
    pub fn new(settings: DatabaseConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
            connection: ConnectionState::Idle,
            mode: ValueMode::default(),
            pending: QueryState::default(),
            result: ResultSet::default(),
            last: None,
        }
    }

    pub fn with_value_mode(mut self, mode: ValueMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn value_mode(&self) -> ValueMode {
        self.mode
    }

    /// Open the connection if it is not open yet, then apply the configured
    /// charset.
    ///
    /// # Errors
    /// Returns [`DbError::ConnectionFailed`] on a failed handshake or charset
    /// setup, and on every later call to this instance.
    pub fn connect(&mut self) -> Result<(), DbError> {
        match &self.connection {
            ConnectionState::Connected(_) => return Ok(()),
            ConnectionState::Failed(message) => {
                return Err(DbError::ConnectionFailed {
                    message: message.clone(),
                });
            }
            ConnectionState::Idle => {}
        }

        let mut connection = match self.connector.connect(&self.settings) {
            Ok(connection) => connection,
            Err(e) => {
                log::error!("{} connection failed: {}", self.connector.backend_name(), e);
                self.connection = ConnectionState::Failed(e.to_string());
                return Err(e);
            }
        };
        if let Err(e) = connection.set_charset(&self.settings.charset) {
            let message = format!("Failed to set charset '{}': {}", self.settings.charset, e);
            log::error!("{} connection failed: {}", self.connector.backend_name(), message);
            self.connection = ConnectionState::Failed(message.clone());
            return Err(DbError::ConnectionFailed { message });
        }
        log::info!("Connected to {} backend", self.connector.backend_name());
        self.connection = ConnectionState::Connected(connection);
        Ok(())
    }

    /// Close the connection. Does nothing when not connected; a later
    /// `connect` opens a fresh one.
    pub fn disconnect(&mut self) -> Result<(), DbError> {
        if let ConnectionState::Connected(connection) = &mut self.connection {
            connection.close()?;
            self.connection = ConnectionState::Idle;
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, ConnectionState::Connected(_))
    }

    pub fn set_charset(&mut self, charset: &str) -> Result<(), DbError> {
        self.connection_mut()?.set_charset(charset)?;
        self.settings.charset = charset.to_string();
        Ok(())
    }

    /// Set the table for the next terminal call.
    pub fn from(&mut self, table: impl Into<String>) -> &mut Self {
        self.pending.table = Some(table.into());
        self
    }

    /// Add one `field = value` predicate.
    pub fn where_eq(&mut self, field: impl Into<String>, value: impl Display) -> &mut Self {
        self.pending
            .conditions
            .push(Condition::equals(field, value.to_string()));
        self
    }

    /// Add one predicate per mapping entry, in iteration order.
    pub fn where_map<I, K, V>(&mut self, mapping: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Display,
    {
        for (field, value) in mapping {
            self.where_eq(field, value);
        }
        self
    }

    /// Builder state not yet consumed by a terminal call.
    pub fn pending(&self) -> &QueryState {
        &self.pending
    }

    pub fn select(&mut self, fields: impl Into<Fields>) -> Result<&mut Self, DbError> {
        let fields = fields.into();
        self.terminal(|table, conditions| {
            Ok(Select {
                table: table.ok_or(DbError::MissingTable { kind: "SELECT" })?,
                fields,
                conditions,
            }
            .into())
        })
    }

    /// Insert one row given as column → value pairs.
    pub fn insert<I, K, V>(&mut self, table: impl Into<String>, row: I) -> Result<&mut Self, DbError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Display,
    {
        let (columns, values): (Vec<String>, Vec<String>) = row
            .into_iter()
            .map(|(column, value)| (column.into(), value.to_string()))
            .unzip();
        let table = table.into();
        self.terminal(|_, conditions| {
            drop_conditions("INSERT", &conditions);
            Ok(Insert {
                table,
                columns: Some(columns),
                values,
            }
            .into())
        })
    }

    /// Insert one positional row; the column list is omitted.
    pub fn insert_values<I, V>(&mut self, table: impl Into<String>, values: I) -> Result<&mut Self, DbError>
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        let table = table.into();
        self.terminal(|_, conditions| {
            drop_conditions("INSERT", &conditions);
            Ok(Insert {
                table,
                columns: None,
                values,
            }
            .into())
        })
    }

    pub fn update<I, K, V>(&mut self, row: I) -> Result<&mut Self, DbError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Display,
    {
        let assignments = row
            .into_iter()
            .map(|(column, value)| (column.into(), value.to_string()))
            .collect();
        self.terminal(|table, conditions| {
            Ok(Update {
                table: table.ok_or(DbError::MissingTable { kind: "UPDATE" })?,
                assignments,
                conditions,
            }
            .into())
        })
    }

    pub fn delete(&mut self) -> Result<&mut Self, DbError> {
        self.terminal(|table, conditions| {
            Ok(Delete {
                table: table.ok_or(DbError::MissingTable { kind: "DELETE" })?,
                conditions,
            }
            .into())
        })
    }

    /// Create a table from column name → type definition pairs.
    pub fn create_table<I, K, V>(&mut self, name: impl Into<String>, fields: I) -> Result<&mut Self, DbError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(column, definition)| (column.into(), definition.into()))
            .collect();
        let table = name.into();
        self.terminal(|_, conditions| {
            drop_conditions("CREATE TABLE", &conditions);
            Ok(CreateTable { table, fields }.into())
        })
    }

    pub fn create_database(&mut self, name: impl Into<String>) -> Result<&mut Self, DbError> {
        let name = name.into();
        self.terminal(|_, conditions| {
            drop_conditions("CREATE DATABASE", &conditions);
            Ok(CreateDatabase { name }.into())
        })
    }

    /// Run a prebuilt statement. Pending builder state is discarded.
    pub fn execute(&mut self, statement: Statement) -> Result<&mut Self, DbError> {
        self.terminal(|_, _| Ok(statement))
    }

    /// Every remaining row, each decoded into `T`.
    pub fn result_objects<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, DbError> {
        self.result.drain_objects()
    }

    /// Every remaining row as a column → value mapping.
    pub fn result_rows(&mut self) -> Vec<Row> {
        self.result.drain_rows()
    }

    /// The next row decoded into `T`, or `None` once exhausted.
    pub fn next_object<T: DeserializeOwned>(&mut self) -> Result<Option<T>, DbError> {
        self.result.next_object()
    }

    /// The next row as a mapping, or `None` once exhausted.
    pub fn next_row(&mut self) -> Option<Row> {
        self.result.next_row()
    }

    /// Rows touched by the last statement, for statements without rows.
    pub fn affected_rows(&self) -> u64 {
        self.result.affected()
    }

    /// The statement compiled by the last terminal call.
    pub fn last_statement(&self) -> Option<&CompiledStatement> {
        self.last.as_ref()
    }

    fn connection_mut(&mut self) -> Result<&mut Box<dyn Connection>, DbError> {
        match &mut self.connection {
            ConnectionState::Connected(connection) => Ok(connection),
            ConnectionState::Failed(message) => Err(DbError::ConnectionFailed {
                message: message.clone(),
            }),
            ConnectionState::Idle => Err(DbError::NotConnected),
        }
    }

    /// Take the pending state, build and run one statement.
    ///
    /// The builder is reset before anything can fail, and the previous
    /// cursor is dropped even when the new statement errors.
    fn terminal<F>(&mut self, build: F) -> Result<&mut Self, DbError>
    where
        F: FnOnce(Option<String>, Vec<Condition>) -> Result<Statement, DbError>,
    {
        let QueryState { table, conditions } = std::mem::take(&mut self.pending);
        self.result = ResultSet::default();
        self.last = None;

        let compiled = build(table, conditions)?.compile(self.mode);
        log::debug!("{} [{} params]", compiled.sql, compiled.params.len());
        self.last = Some(compiled.clone());

        let outcome = self.connection_mut()?.execute(&compiled)?;
        self.result = outcome.into();
        Ok(self)
    }
}

/// INSERT and CREATE have no WHERE clause; predicates queued before them are
/// discarded.
fn drop_conditions(kind: &str, conditions: &[Condition]) {
    if !conditions.is_empty() {
        log::warn!(
            "Discarding {} pending condition(s) before {}",
            conditions.len(),
            kind
        );
    }
}

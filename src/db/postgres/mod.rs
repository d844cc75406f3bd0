//! PostgreSQL driver.
//!
//! Uses the blocking `postgres` client. Statements that return rows go
//! through the extended protocol so columns come back typed; bound values are
//! converted to the parameter types the server inferred while preparing, or
//! sent as text for the server to coerce.
//! Row-less statements without bound values (DDL, `CREATE DATABASE`) use the
//! simple protocol.

mod conversion;

use postgres::{Client, NoTls, SimpleQueryMessage};

use super::DbError;
use super::backend::{Connection, Connector, QueryResult};
use super::config::DatabaseConfig;
use super::escape::quote_literal;
use super::statement::CompiledStatement;

pub use conversion::{bind_param, column_value};

/// Opens PostgreSQL sessions from [`DatabaseConfig`] settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

impl PostgresConnector {
    /// Build client settings.
    ///
    /// A connection URL wins over the individual fields; missing fields fall
    /// back to the `postgres` crate defaults.
    pub fn client_config(settings: &DatabaseConfig) -> Result<postgres::Config, DbError> {
        if let Some(url) = &settings.url {
            return url.parse().map_err(|e: postgres::Error| DbError::ConnectionFailed {
                message: format!("Invalid connection string: {}", e),
            });
        }

        let mut config = postgres::Config::new();
        config.host(settings.server.as_deref().unwrap_or("localhost"));
        if let Some(port) = settings.port {
            config.port(port);
        }
        if let Some(user) = &settings.username {
            config.user(user);
        }
        if let Some(password) = &settings.password {
            config.password(password);
        }
        if let Some(database) = &settings.database {
            config.dbname(database);
        }
        Ok(config)
    }
}

impl Connector for PostgresConnector {
    fn connect(&self, settings: &DatabaseConfig) -> Result<Box<dyn Connection>, DbError> {
        let client = Self::client_config(settings)?
            .connect(NoTls)
            .map_err(|e| DbError::ConnectionFailed {
                message: format!("Failed to connect to PostgreSQL: {}", e),
            })?;
        Ok(Box::new(PostgresConnection {
            client: Some(client),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "Postgres"
    }
}

pub struct PostgresConnection {
    client: Option<Client>,
}

impl PostgresConnection {
    fn client(&mut self) -> Result<&mut Client, DbError> {
        self.client.as_mut().ok_or(DbError::NotConnected)
    }

    fn query_rows(&mut self, statement: &CompiledStatement) -> Result<QueryResult, DbError> {
        let client = self.client()?;
        let prepared = client.prepare(&statement.sql).map_err(query_failed)?;
        let params = bind_params(prepared.params(), &statement.params)?;
        let refs: Vec<&(dyn postgres::types::ToSql + Sync)> =
            params.iter().map(|p| &**p as &(dyn postgres::types::ToSql + Sync)).collect();

        let rows = client.query(&prepared, &refs).map_err(query_failed)?;
        let headers = prepared
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|idx| column_value(row, idx))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryResult {
            headers,
            rows,
            affected: 0,
        })
    }

    fn execute_bound(&mut self, statement: &CompiledStatement) -> Result<QueryResult, DbError> {
        let client = self.client()?;
        let prepared = client.prepare(&statement.sql).map_err(query_failed)?;
        let params = bind_params(prepared.params(), &statement.params)?;
        let refs: Vec<&(dyn postgres::types::ToSql + Sync)> =
            params.iter().map(|p| &**p as &(dyn postgres::types::ToSql + Sync)).collect();

        let affected = client.execute(&prepared, &refs).map_err(query_failed)?;
        Ok(QueryResult::affected(affected))
    }

    fn execute_simple(&mut self, statement: &CompiledStatement) -> Result<QueryResult, DbError> {
        let messages = self
            .client()?
            .simple_query(&statement.sql)
            .map_err(query_failed)?;
        let affected = messages
            .iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::CommandComplete(count) => Some(*count),
                _ => None,
            })
            .sum();
        Ok(QueryResult::affected(affected))
    }
}

impl Connection for PostgresConnection {
    fn execute(&mut self, statement: &CompiledStatement) -> Result<QueryResult, DbError> {
        if statement.kind.returns_rows() {
            self.query_rows(statement)
        } else if statement.params.is_empty() {
            self.execute_simple(statement)
        } else {
            self.execute_bound(statement)
        }
    }

    fn set_charset(&mut self, charset: &str) -> Result<(), DbError> {
        let sql = format!("SET client_encoding TO {}", quote_literal(charset));
        self.client()?.batch_execute(&sql).map_err(query_failed)
    }

    fn close(&mut self) -> Result<(), DbError> {
        match self.client.take() {
            Some(client) => client.close().map_err(query_failed),
            None => Ok(()),
        }
    }
}

fn bind_params(
    types: &[postgres::types::Type],
    values: &[String],
) -> Result<Vec<Box<dyn postgres::types::ToSql + Sync>>, DbError> {
    if types.len() != values.len() {
        return Err(DbError::QueryFailed {
            message: format!(
                "Statement expects {} parameter(s), got {}",
                types.len(),
                values.len()
            ),
        });
    }
    types
        .iter()
        .zip(values)
        .map(|(ty, value)| bind_param(ty, value))
        .collect()
}

fn query_failed(e: postgres::Error) -> DbError {
    DbError::QueryFailed {
        message: e.to_string(),
    }
}

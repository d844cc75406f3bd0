//! Driver traits separating the query builder from a concrete database.
//!
//! A [`Connector`] knows how to open a [`Connection`]; the connection runs
//! compiled statements and hands back a [`QueryResult`]. The PostgreSQL driver
//! and the in-process recording driver both implement these traits.

use serde_json::Value;

use super::DbError;
use super::config::DatabaseConfig;
use super::statement::CompiledStatement;

/// Result of one statement execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Rows touched by a statement that does not return rows.
    pub affected: u64,
}

impl QueryResult {
    /// A row-less result reporting `affected` touched rows.
    pub fn affected(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }
}

/// Opens connections. Shared by every [`Database`](super::Database) built
/// from the same services.
pub trait Connector: Send + Sync {
    /// Open a new connection.
    ///
    /// # Errors
    /// Returns [`DbError::ConnectionFailed`] if the handshake fails.
    fn connect(&self, config: &DatabaseConfig) -> Result<Box<dyn Connection>, DbError>;

    /// Get the backend name for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// One open database session, owned by exactly one `Database`.
pub trait Connection {
    /// Run a compiled statement.
    fn execute(&mut self, statement: &CompiledStatement) -> Result<QueryResult, DbError>;

    /// Switch the client character set.
    fn set_charset(&mut self, charset: &str) -> Result<(), DbError>;

    /// Close the session. Further use is a caller error.
    fn close(&mut self) -> Result<(), DbError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affected_result_has_no_rows() {
        let result = QueryResult::affected(3);
        assert_eq!(result.affected, 3);
        assert!(result.rows.is_empty());
        assert!(result.headers.is_empty());
    }

    #[test]
    fn test_traits_are_object_safe() {
        fn accepts_connector(_connector: &dyn Connector) {}
        fn accepts_connection(_connection: &mut dyn Connection) {}
        let _ = accepts_connector;
        let _ = accepts_connection;
    }
}

//! In-process driver that journals statements instead of sending them.
//!
//! Used by the `--dry-run` flag and by tests. Every connection opened from
//! one [`RecordingConnector`] shares the same [`Journal`], so a test can keep
//! a clone of the connector and inspect what a model executed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::DbError;
use super::backend::{Connection, Connector, QueryResult};
use super::config::DatabaseConfig;
use super::statement::CompiledStatement;

#[derive(Debug, Default)]
pub struct Journal {
    pub statements: Vec<CompiledStatement>,
    pub charsets: Vec<String>,
    pub connects: usize,
    pub closes: usize,
    /// Results handed out in order; an empty queue yields empty results.
    pub queued: VecDeque<Result<QueryResult, String>>,
    /// Message returned by `connect` when set.
    pub refuse_connect: Option<String>,
    /// Message returned by `set_charset` when set.
    pub refuse_charset: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    journal: Arc<Mutex<Journal>>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose every handshake fails with `message`.
    pub fn refusing(message: impl Into<String>) -> Self {
        let connector = Self::new();
        connector.journal().refuse_connect = Some(message.into());
        connector
    }

    /// Queue the result for the next executed statement.
    pub fn push_result(&self, result: QueryResult) -> &Self {
        self.journal().queued.push_back(Ok(result));
        self
    }

    /// Queue a failure for the next executed statement.
    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.journal().queued.push_back(Err(message.into()));
        self
    }

    /// SQL text of every executed statement, in order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.journal().statements.iter().map(|s| s.sql.clone()).collect()
    }

    pub fn statements(&self) -> Vec<CompiledStatement> {
        self.journal().statements.clone()
    }

    pub fn connects(&self) -> usize {
        self.journal().connects
    }

    pub fn closes(&self) -> usize {
        self.journal().closes
    }

    pub fn charsets(&self) -> Vec<String> {
        self.journal().charsets.clone()
    }

    pub fn journal(&self) -> MutexGuard<'_, Journal> {
        // A poisoned journal only means a test panicked mid-record.
        self.journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Connector for RecordingConnector {
    fn connect(&self, _config: &DatabaseConfig) -> Result<Box<dyn Connection>, DbError> {
        let mut journal = self.journal();
        if let Some(message) = &journal.refuse_connect {
            return Err(DbError::ConnectionFailed {
                message: message.clone(),
            });
        }
        journal.connects += 1;
        Ok(Box::new(RecordingConnection {
            journal: Arc::clone(&self.journal),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "Recording"
    }
}

struct RecordingConnection {
    journal: Arc<Mutex<Journal>>,
}

impl RecordingConnection {
    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Connection for RecordingConnection {
    fn execute(&mut self, statement: &CompiledStatement) -> Result<QueryResult, DbError> {
        let mut journal = self.journal();
        journal.statements.push(statement.clone());
        match journal.queued.pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(DbError::QueryFailed { message }),
            None => Ok(QueryResult::default()),
        }
    }

    fn set_charset(&mut self, charset: &str) -> Result<(), DbError> {
        let mut journal = self.journal();
        if let Some(message) = &journal.refuse_charset {
            return Err(DbError::QueryFailed {
                message: message.clone(),
            });
        }
        journal.charsets.push(charset.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), DbError> {
        self.journal().closes += 1;
        Ok(())
    }
}

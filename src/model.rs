//! Base model and the dependency impls for query builders.

use crate::controller::Dependency;
use crate::db::{Database, DbError};
use crate::loader::Services;

/// A model owning one query builder for the configured database.
///
/// Application models embed a `Model` and delegate `connect` to it:
///
/// ```ignore
/// struct Users {
///     model: Model,
/// }
///
/// impl Dependency for Users {
///     fn connect(&mut self) -> Result<(), DbError> {
///         self.model.connect()
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Model {
    db: Database,
}

impl Model {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn from_services(services: &Services) -> Self {
        Self::new(services.database())
    }

    pub fn connect(&mut self) -> Result<(), DbError> {
        self.db.connect()
    }

    pub fn disconnect(&mut self) -> Result<(), DbError> {
        self.db.disconnect()
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut Database {
        &mut self.db
    }
}

impl Dependency for Model {
    fn connect(&mut self) -> Result<(), DbError> {
        Model::connect(self)
    }
}

impl Dependency for Database {
    fn connect(&mut self) -> Result<(), DbError> {
        Database::connect(self)
    }
}

//! minimvc library - a small model/view/controller framework
//!
//! Provides request parsing, app/core component resolution, controller
//! dispatch, and a query builder over PostgreSQL for handling one request per
//! process.

pub mod bundled;
pub mod cli;
pub mod config;
pub mod controller;
pub mod csv_file;
pub mod db;
pub mod file;
pub mod helpers;
pub mod loader;
pub mod model;
pub mod request;
pub mod router;
pub mod view;

pub use config::Config;
pub use controller::{ActionResult, ActiveController, Context, Controller, Dependencies, Dependency};
pub use db::{Database, DbError};
pub use loader::{Catalog, ComponentKind, LoadError, Loader, Root, Services};
pub use model::Model;
pub use request::Request;
pub use router::{DispatchError, Dispatched, Router};

//! Dependency registry and the controller construction handle.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;

use crate::config::Config;
use crate::db::DbError;
use crate::loader::{HelperFn, LoadError, Loader};

/// Upcast to [`Any`] so registry entries can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A model or library instance a controller holds under a logical name.
pub trait Dependency: AsAny {
    /// Open whatever connection the dependency needs. Called by the loader
    /// when a model is attached with autoconnect.
    fn connect(&mut self) -> Result<(), DbError> {
        Ok(())
    }
}

/// Named dependencies of one controller, in attachment order.
///
/// Attaching under a name that is already taken replaces the previous
/// instance.
#[derive(Default)]
pub struct Dependencies {
    entries: IndexMap<String, Box<dyn Dependency>>,
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `dependency` as `name`, returning the instance it replaced.
    pub fn attach(
        &mut self,
        name: impl Into<String>,
        dependency: Box<dyn Dependency>,
    ) -> Option<Box<dyn Dependency>> {
        self.entries.insert(name.into(), dependency)
    }

    /// Typed access. `None` when nothing is attached as `name` or the
    /// attached instance is not a `T`.
    pub fn get<T: Dependency>(&self, name: &str) -> Option<&T> {
        self.entries
            .get(name)
            .and_then(|d| (**d).as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Dependency>(&mut self, name: &str) -> Option<&mut T> {
        self.entries
            .get_mut(name)
            .and_then(|d| (**d).as_any_mut().downcast_mut::<T>())
    }

    /// Untyped access, for operations every dependency supports.
    pub fn get_dyn_mut(&mut self, name: &str) -> Option<&mut (dyn Dependency + 'static)> {
        self.entries.get_mut(name).map(|d| d.as_mut())
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Dependency>> {
        self.entries.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Handle passed to a controller factory while the controller is built.
///
/// Models and libraries loaded through it are attached to the dependencies of
/// the controller under construction. The factory moves them into the
/// controller with [`ActiveController::into_dependencies`].
pub struct ActiveController<'a> {
    loader: &'a mut Loader,
    name: String,
    dependencies: Dependencies,
}

impl<'a> ActiveController<'a> {
    pub(crate) fn new(loader: &'a mut Loader, name: impl Into<String>) -> Self {
        Self {
            loader,
            name: name.into(),
            dependencies: Dependencies::new(),
        }
    }

    /// Logical name of the controller being built.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load model `name` and attach it under the same name.
    pub fn model(&mut self, name: &str, autoconnect: bool) -> Result<(), LoadError> {
        self.loader
            .model_into(&mut self.dependencies, name, None, autoconnect)
    }

    /// Load model `name` and attach it as `alias`.
    pub fn model_as(&mut self, name: &str, alias: &str, autoconnect: bool) -> Result<(), LoadError> {
        self.loader
            .model_into(&mut self.dependencies, name, Some(alias), autoconnect)
    }

    /// Load library `name` and attach it under the same name.
    pub fn library(&mut self, name: &str) -> Result<(), LoadError> {
        self.loader.library_into(&mut self.dependencies, name, None)
    }

    pub fn library_as(&mut self, name: &str, alias: &str) -> Result<(), LoadError> {
        self.loader
            .library_into(&mut self.dependencies, name, Some(alias))
    }

    pub fn helper(&mut self, name: &str) -> Result<HelperFn, LoadError> {
        self.loader.helper(name)
    }

    pub fn config(&self) -> &Config {
        self.loader.config()
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    pub fn into_dependencies(self) -> Dependencies {
        self.dependencies
    }
}

//! Registered component definitions.
//!
//! The catalog plays the part of the component directories: a component
//! "exists" under a root when a definition is registered at its path. Views
//! are the exception and are read from disk by the loader.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::controller::{ActiveController, Controller, Dependency};

use super::{ComponentKind, ComponentPath, LoadError, Root, Services};

pub type ControllerFactory =
    Arc<dyn Fn(ActiveController<'_>) -> Result<Box<dyn Controller>, LoadError> + Send + Sync>;

/// Builds a model or library instance.
pub type DependencyFactory =
    Arc<dyn Fn(&Services) -> Result<Box<dyn Dependency>, LoadError> + Send + Sync>;

pub type HelperFn = fn(&str) -> String;

/// Runs once, the first time a component is loaded.
pub type LoadHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub enum Definition {
    Controller(ControllerFactory),
    Model(DependencyFactory),
    Library(DependencyFactory),
    Helper(HelperFn),
}

impl Definition {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Definition::Controller(_) => ComponentKind::Controller,
            Definition::Model(_) => ComponentKind::Model,
            Definition::Library(_) => ComponentKind::Library,
            Definition::Helper(_) => ComponentKind::Helper,
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Definition::{:?}", self.kind())
    }
}

#[derive(Clone, Default)]
pub struct Catalog {
    definitions: HashMap<ComponentPath, Definition>,
    hooks: HashMap<ComponentPath, LoadHook>,
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<String> = self.definitions.keys().map(|p| p.to_string()).collect();
        paths.sort();
        f.debug_struct("Catalog").field("definitions", &paths).finish()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition` at `path`, replacing any previous one.
    pub fn register(&mut self, path: ComponentPath, definition: Definition) -> &mut Self {
        self.definitions.insert(path, definition);
        self
    }

    pub fn controller<F, C>(&mut self, root: Root, name: &str, factory: F) -> &mut Self
    where
        F: Fn(ActiveController<'_>) -> Result<C, LoadError> + Send + Sync + 'static,
        C: Controller + 'static,
    {
        let factory: ControllerFactory = Arc::new(move |active: ActiveController<'_>| {
            factory(active).map(|c| Box::new(c) as Box<dyn Controller>)
        });
        self.register(
            ComponentPath::new(root, ComponentKind::Controller, name),
            Definition::Controller(factory),
        )
    }

    pub fn model<F, D>(&mut self, root: Root, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&Services) -> Result<D, LoadError> + Send + Sync + 'static,
        D: Dependency,
    {
        self.register(
            ComponentPath::new(root, ComponentKind::Model, name),
            Definition::Model(boxed_dependency(factory)),
        )
    }

    pub fn library<F, D>(&mut self, root: Root, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&Services) -> Result<D, LoadError> + Send + Sync + 'static,
        D: Dependency,
    {
        self.register(
            ComponentPath::new(root, ComponentKind::Library, name),
            Definition::Library(boxed_dependency(factory)),
        )
    }

    pub fn helper(&mut self, root: Root, name: &str, helper: HelperFn) -> &mut Self {
        self.register(
            ComponentPath::new(root, ComponentKind::Helper, name),
            Definition::Helper(helper),
        )
    }

    /// Attach code to run the first time the component at `path` is loaded.
    pub fn on_load(&mut self, path: ComponentPath, hook: impl Fn() + Send + Sync + 'static) -> &mut Self {
        self.hooks.insert(path, Arc::new(hook));
        self
    }

    /// Add every definition and hook of `other`, overwriting on conflict.
    pub fn extend(&mut self, other: Catalog) -> &mut Self {
        self.definitions.extend(other.definitions);
        self.hooks.extend(other.hooks);
        self
    }

    pub fn contains(&self, path: &ComponentPath) -> bool {
        self.definitions.contains_key(path)
    }

    pub fn get(&self, path: &ComponentPath) -> Option<&Definition> {
        self.definitions.get(path)
    }

    pub(crate) fn hook(&self, path: &ComponentPath) -> Option<LoadHook> {
        self.hooks.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn boxed_dependency<F, D>(factory: F) -> DependencyFactory
where
    F: Fn(&Services) -> Result<D, LoadError> + Send + Sync + 'static,
    D: Dependency,
{
    Arc::new(move |services: &Services| {
        factory(services).map(|d| Box::new(d) as Box<dyn Dependency>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl Dependency for Plain {}

    fn shout(text: &str) -> String {
        text.to_uppercase()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut catalog = Catalog::new();
        catalog
            .library(Root::Core, "Plain", |_| Ok(Plain))
            .helper(Root::App, "shout", shout);

        let library = ComponentPath::new(Root::Core, ComponentKind::Library, "Plain");
        let helper = ComponentPath::new(Root::App, ComponentKind::Helper, "shout");
        assert!(catalog.contains(&library));
        assert!(!catalog.contains(&ComponentPath::new(Root::App, ComponentKind::Library, "Plain")));
        assert_eq!(catalog.get(&library).map(Definition::kind), Some(ComponentKind::Library));
        match catalog.get(&helper) {
            Some(Definition::Helper(f)) => assert_eq!(f("hi"), "HI"),
            other => panic!("Expected helper, got {:?}", other),
        }
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_extend_overwrites() {
        let mut base = Catalog::new();
        base.helper(Root::Core, "shout", shout);

        let mut overrides = Catalog::new();
        overrides.library(Root::Core, "Plain", |_| Ok(Plain));
        overrides.register(
            ComponentPath::new(Root::Core, ComponentKind::Helper, "shout"),
            Definition::Helper(str::to_string),
        );
        base.extend(overrides);

        assert_eq!(base.len(), 2);
        match base.get(&ComponentPath::new(Root::Core, ComponentKind::Helper, "shout")) {
            Some(Definition::Helper(f)) => assert_eq!(f("hi"), "hi"),
            other => panic!("Expected helper, got {:?}", other),
        }
    }
}

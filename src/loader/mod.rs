//! Component resolution and loading.
//!
//! Every component has a kind and a logical name. Resolution looks the name up
//! under the application root first and falls back to the core root, so an
//! application can override any framework component by defining one with the
//! same name.
//!
//! Loading is idempotent per resolved path: the first load of a path runs its
//! load hook, later loads only resolve. Instances are still built on every
//! `controller`/`model`/`library` call.

mod catalog;

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::controller::{ActiveController, Controller, Dependencies};
use crate::db::{Connector, Database, DatabaseConfig, DbError};
use crate::helpers::ucfirst;
use crate::view::{VIEW_EXTENSION, View, ViewData, ViewError};

pub use catalog::{Catalog, ControllerFactory, Definition, DependencyFactory, HelperFn, LoadHook};

/// One of the two directories components are looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    App,
    Core,
}

impl Root {
    /// Lookup order.
    pub const ORDER: [Root; 2] = [Root::App, Root::Core];
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Root::App => write!(f, "app"),
            Root::Core => write!(f, "core"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Controller,
    Model,
    Helper,
    Library,
    View,
}

impl ComponentKind {
    /// Directory of this kind of component under a root.
    pub fn directory(self) -> &'static str {
        match self {
            ComponentKind::Controller => "controllers",
            ComponentKind::Model => "models",
            ComponentKind::Helper => "helpers",
            ComponentKind::Library => "libs",
            ComponentKind::View => "views",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Controller => "controller",
            ComponentKind::Model => "model",
            ComponentKind::Helper => "helper",
            ComponentKind::Library => "library",
            ComponentKind::View => "view",
        };
        write!(f, "{}", name)
    }
}

/// A resolved component: which root it lives under, its kind and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentPath {
    root: Root,
    kind: ComponentKind,
    name: String,
}

impl ComponentPath {
    pub fn new(root: Root, kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            root,
            kind,
            name: name.into(),
        }
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path relative to the root, e.g. `controllers/Users`.
    pub fn relative(&self) -> String {
        format!("{}/{}", self.kind.directory(), self.name)
    }
}

impl fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.root, self.relative())
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("No {kind} named '{name}' in the app or core root")]
    NotFound { kind: ComponentKind, name: String },

    #[error("Invalid {kind} name '{name}'")]
    InvalidName { kind: ComponentKind, name: String },

    #[error("{path} is a {found}, expected a {expected}")]
    KindMismatch {
        path: String,
        expected: ComponentKind,
        found: ComponentKind,
    },

    #[error("Failed to build '{name}': {message}")]
    Construction { name: String, message: String },

    #[error("Failed to connect model '{name}': {source}")]
    Connect {
        name: String,
        #[source]
        source: DbError,
    },

    #[error(transparent)]
    View(#[from] ViewError),
}

impl LoadError {
    pub fn construction(name: impl Into<String>, message: impl fmt::Display) -> Self {
        LoadError::Construction {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

/// Shared services handed to component factories.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub connector: Arc<dyn Connector>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .field("connector", &self.connector.backend_name())
            .finish()
    }
}

impl Services {
    pub fn new(config: Config, connector: Arc<dyn Connector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }

    /// A new, unconnected query builder for the configured database.
    pub fn database(&self) -> Database {
        Database::new(DatabaseConfig::resolve(&self.config), Arc::clone(&self.connector))
    }
}

/// Directories backing the two roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roots {
    pub app: PathBuf,
    pub core: PathBuf,
}

impl Roots {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let app = config
            .app_path()
            .ok_or_else(|| missing(crate::config::APP_SECTION))?;
        let core = config
            .core_path()
            .ok_or_else(|| missing(crate::config::CORE_SECTION))?;
        Ok(Self { app, core })
    }

    pub fn dir(&self, root: Root) -> &Path {
        match root {
            Root::App => &self.app,
            Root::Core => &self.core,
        }
    }

    /// On-disk location of a component.
    pub fn file(&self, path: &ComponentPath) -> PathBuf {
        let file = match path.kind {
            ComponentKind::View => format!("{}.{}", path.name, VIEW_EXTENSION),
            _ => path.name.clone(),
        };
        self.dir(path.root).join(path.kind.directory()).join(file)
    }
}

fn missing(section: &str) -> ConfigError {
    ConfigError::Missing {
        section: section.to_string(),
        property: "PATH".to_string(),
    }
}

fn mismatch(path: &ComponentPath, found: &Definition) -> LoadError {
    LoadError::KindMismatch {
        path: path.to_string(),
        expected: path.kind,
        found: found.kind(),
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub struct Loader {
    services: Services,
    catalog: Catalog,
    roots: Roots,
    loaded: HashSet<ComponentPath>,
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("roots", &self.roots)
            .field("catalog", &self.catalog)
            .field("loaded", &self.loaded.len())
            .finish()
    }
}

impl Loader {
    /// Create a loader over the roots named in the services' configuration.
    pub fn new(services: Services, catalog: Catalog) -> Result<Self, ConfigError> {
        let roots = Roots::from_config(&services.config)?;
        Ok(Self::with_roots(services, catalog, roots))
    }

    pub fn with_roots(services: Services, catalog: Catalog, roots: Roots) -> Self {
        Self {
            services,
            catalog,
            roots,
            loaded: HashSet::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.services.config
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Whether a component exists at `path`.
    pub fn exists(&self, path: &ComponentPath) -> bool {
        match path.kind {
            ComponentKind::View => self.roots.file(path).is_file(),
            _ => self.catalog.contains(path),
        }
    }

    /// Find component `name`, preferring the application root.
    pub fn resolve(&self, kind: ComponentKind, name: &str) -> Result<ComponentPath, LoadError> {
        if !is_valid_name(name) {
            return Err(LoadError::InvalidName {
                kind,
                name: name.to_string(),
            });
        }

        Root::ORDER
            .iter()
            .map(|&root| ComponentPath::new(root, kind, name))
            .find(|path| self.exists(path))
            .ok_or_else(|| LoadError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// Resolve component `name` and load it if this is its first load.
    pub fn resolve_and_load(&mut self, kind: ComponentKind, name: &str) -> Result<ComponentPath, LoadError> {
        let path = self.resolve(kind, name)?;
        if self.loaded.insert(path.clone()) {
            log::debug!("Including {}", path);
            if let Some(hook) = self.catalog.hook(&path) {
                hook();
            }
        }
        Ok(path)
    }

    /// Boolean form of [`Loader::resolve_and_load`]; failures are logged.
    pub fn load(&mut self, kind: ComponentKind, name: &str) -> bool {
        match self.resolve_and_load(kind, name) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Load failed: {}", e);
                false
            }
        }
    }

    pub fn is_loaded(&self, path: &ComponentPath) -> bool {
        self.loaded.contains(path)
    }

    /// Build controller `name`. The name is normalised with `ucfirst`.
    pub fn controller(&mut self, name: &str) -> Result<Box<dyn Controller>, LoadError> {
        let name = ucfirst(name);
        let path = self.resolve_and_load(ComponentKind::Controller, &name)?;
        let factory = match self.definition(&path)? {
            Definition::Controller(factory) => factory,
            other => return Err(mismatch(&path, &other)),
        };

        let controller = factory(ActiveController::new(self, name.as_str()))?;
        log::info!("Constructed controller {}", path);
        Ok(controller)
    }

    /// Build model `name` and attach it to `target` as `alias` (or `name`).
    ///
    /// With `autoconnect` the model is connected right after attachment; a
    /// failed connection leaves the model attached.
    pub fn model_into(
        &mut self,
        target: &mut Dependencies,
        name: &str,
        alias: Option<&str>,
        autoconnect: bool,
    ) -> Result<(), LoadError> {
        let path = self.resolve_and_load(ComponentKind::Model, name)?;
        let factory = match self.definition(&path)? {
            Definition::Model(factory) => factory,
            other => return Err(mismatch(&path, &other)),
        };

        let attached_as = alias.unwrap_or(name);
        target.attach(attached_as, factory(&self.services)?);
        log::debug!("Attached model {} as '{}'", path, attached_as);

        if autoconnect {
            if let Some(model) = target.get_dyn_mut(attached_as) {
                model.connect().map_err(|source| LoadError::Connect {
                    name: attached_as.to_string(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Build library `name` and attach it to `target` as `alias` (or `name`).
    pub fn library_into(
        &mut self,
        target: &mut Dependencies,
        name: &str,
        alias: Option<&str>,
    ) -> Result<(), LoadError> {
        let path = self.resolve_and_load(ComponentKind::Library, name)?;
        let factory = match self.definition(&path)? {
            Definition::Library(factory) => factory,
            other => return Err(mismatch(&path, &other)),
        };

        let attached_as = alias.unwrap_or(name);
        target.attach(attached_as, factory(&self.services)?);
        log::debug!("Attached library {} as '{}'", path, attached_as);
        Ok(())
    }

    pub fn helper(&mut self, name: &str) -> Result<HelperFn, LoadError> {
        let path = self.resolve_and_load(ComponentKind::Helper, name)?;
        match self.definition(&path)? {
            Definition::Helper(helper) => Ok(helper),
            other => Err(mismatch(&path, &other)),
        }
    }

    /// Render view `name` with `data` and append it to `out`.
    pub fn view(&mut self, name: &str, data: &ViewData, out: &mut String) -> Result<(), LoadError> {
        let path = self.resolve_and_load(ComponentKind::View, name)?;
        let view = View::load(name, &self.roots.file(&path))?;
        view.render_into(data, out);
        Ok(())
    }

    fn definition(&self, path: &ComponentPath) -> Result<Definition, LoadError> {
        self.catalog
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                kind: path.kind,
                name: path.name.clone(),
            })
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        let roots = Roots {
            app: PathBuf::from("/nonexistent/app"),
            core: PathBuf::from("/nonexistent/core"),
        };
        let services = Services::new(
            Config::new(),
            Arc::new(crate::db::RecordingConnector::new()),
        );
        Self::with_roots(services, Catalog::new(), roots)
    }
}

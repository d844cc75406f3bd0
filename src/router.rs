//! Request dispatch.
//!
//! The router builds the requested controller, falling back to the
//! configured default controller, picks the requested action or `index`,
//! and runs it with the request parameters.

use serde::Serialize;
use thiserror::Error;

use crate::controller::{ActionError, Context, Controller, INDEX_ACTION};
use crate::loader::{ComponentKind, LoadError, Loader};
use crate::request::Request;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No controller available: '{requested}' and default '{default}' could not be built")]
    NoControllerAvailable { requested: String, default: String },

    #[error("Controller '{controller}' has neither '{method}' nor 'index'")]
    UnknownMethod { controller: String, method: String },

    #[error("Controller '{controller}' could not be built: {source}")]
    Load {
        controller: String,
        #[source]
        source: LoadError,
    },

    #[error("{controller}::{method} failed: {source}")]
    Action {
        controller: String,
        method: String,
        #[source]
        source: ActionError,
    },
}

impl DispatchError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            DispatchError::NoControllerAvailable { .. } => 3,
            DispatchError::UnknownMethod { .. } => 4,
            DispatchError::Load { .. } | DispatchError::Action { .. } => 1,
        }
    }
}

/// Which controller and action handled a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dispatched {
    pub controller: String,
    pub method: String,
    pub used_default_controller: bool,
    pub used_index: bool,
}

#[derive(Debug)]
pub struct Router {
    loader: Loader,
}

impl Router {
    pub fn new(loader: Loader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut Loader {
        &mut self.loader
    }

    /// Handle `request`, appending whatever the action renders to `out`.
    ///
    /// # Errors
    /// * [`DispatchError::NoControllerAvailable`] when neither the requested
    ///   nor the default controller can be built
    /// * [`DispatchError::Load`] when a controller exists but building it
    ///   fails, e.g. a model cannot connect
    /// * [`DispatchError::UnknownMethod`] when the controller has neither the
    ///   requested action nor `index`
    /// * [`DispatchError::Action`] when the action itself fails
    pub fn dispatch(&mut self, request: &Request, out: &mut String) -> Result<Dispatched, DispatchError> {
        let (name, mut controller, used_default_controller) = self.select_controller(request.controller())?;

        let requested = request.method();
        let (method, used_index) = if !requested.is_empty() && controller.responds_to(requested) {
            (requested, false)
        } else {
            if !requested.is_empty() {
                log::warn!("{} has no action '{}', using index", name, requested);
            }
            (INDEX_ACTION, true)
        };

        if !controller.responds_to(method) {
            return Err(DispatchError::UnknownMethod {
                controller: name,
                method: requested.to_string(),
            });
        }

        log::info!("Dispatching {}::{} with {} param(s)", name, method, request.params().len());
        let mut ctx = Context::new(&mut self.loader, out);
        controller
            .invoke(method, &mut ctx, request.params())
            .map_err(|source| DispatchError::Action {
                controller: name.clone(),
                method: method.to_string(),
                source,
            })?;

        Ok(Dispatched {
            controller: name,
            method: method.to_string(),
            used_default_controller,
            used_index,
        })
    }

    fn select_controller(
        &mut self,
        requested: &str,
    ) -> Result<(String, Box<dyn Controller>, bool), DispatchError> {
        if !requested.is_empty() {
            match self.loader.controller(requested) {
                Ok(controller) => return Ok((crate::helpers::ucfirst(requested), controller, false)),
                Err(e) if is_unresolved(&e) => log::warn!("Falling back to the default controller: {}", e),
                Err(source) => {
                    return Err(DispatchError::Load {
                        controller: crate::helpers::ucfirst(requested),
                        source,
                    });
                }
            }
        }

        let default = self.loader.config().default_controller().unwrap_or("").to_string();
        let unavailable = || DispatchError::NoControllerAvailable {
            requested: requested.to_string(),
            default: default.clone(),
        };
        if default.is_empty() {
            log::error!("No default controller configured");
            return Err(unavailable());
        }

        match self.loader.controller(&default) {
            Ok(controller) => Ok((crate::helpers::ucfirst(&default), controller, true)),
            Err(e) if is_unresolved(&e) => {
                log::error!("Default controller failed: {}", e);
                Err(unavailable())
            }
            Err(source) => Err(DispatchError::Load {
                controller: crate::helpers::ucfirst(&default),
                source,
            }),
        }
    }
}

/// Only a controller that does not resolve triggers the default fallback.
fn is_unresolved(e: &LoadError) -> bool {
    matches!(
        e,
        LoadError::NotFound {
            kind: ComponentKind::Controller,
            ..
        } | LoadError::InvalidName {
            kind: ComponentKind::Controller,
            ..
        }
    )
}

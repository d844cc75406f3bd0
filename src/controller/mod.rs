//! Controllers and the context their actions run in.
//!
//! A controller is built by a factory registered in the
//! [`Catalog`](crate::loader::Catalog). The factory receives an
//! [`ActiveController`] handle for loading the models and libraries the
//! controller depends on, then keeps the resulting [`Dependencies`].
//!
//! Actions are plain methods with the [`Action`] shape; [`impl_controller!`]
//! generates the name-based dispatch for them:
//!
//! ```ignore
//! struct Users {
//!     deps: Dependencies,
//! }
//!
//! impl Users {
//!     fn index(&mut self, ctx: &mut Context<'_>, _params: &[String]) -> ActionResult {
//!         ctx.write("all users");
//!         Ok(())
//!     }
//! }
//!
//! impl_controller!(Users, deps, [index]);
//! ```

mod registry;

use crate::loader::{LoadError, Loader};
use crate::view::ViewData;

pub use registry::{ActiveController, AsAny, Dependencies, Dependency};

/// Error an action may fail with. Any error type converts into it with `?`.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

pub type ActionResult = Result<(), ActionError>;

/// Signature of a controller action.
pub type Action<C> = fn(&mut C, &mut Context<'_>, &[String]) -> ActionResult;

/// Name of the action used when a request names none or an unknown one.
pub const INDEX_ACTION: &str = "index";

pub trait Controller {
    /// Whether `action` names one of this controller's actions.
    fn responds_to(&self, action: &str) -> bool;

    /// Run `action` with the request parameters, in order.
    fn invoke(&mut self, action: &str, ctx: &mut Context<'_>, params: &[String]) -> ActionResult;

    fn dependencies(&self) -> &Dependencies;

    fn dependencies_mut(&mut self) -> &mut Dependencies;
}

/// What an action can reach while it runs: the loader and the response body.
pub struct Context<'a> {
    loader: &'a mut Loader,
    output: &'a mut String,
}

impl<'a> Context<'a> {
    pub fn new(loader: &'a mut Loader, output: &'a mut String) -> Self {
        Self { loader, output }
    }

    /// Render view `name` into the response.
    pub fn view(&mut self, name: &str, data: &ViewData) -> Result<(), LoadError> {
        self.loader.view(name, data, &mut *self.output)
    }

    pub fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub fn output(&self) -> &str {
        self.output.as_str()
    }

    pub fn loader(&mut self) -> &mut Loader {
        &mut *self.loader
    }
}

/// Implement [`Controller`] for a type from its dependency field and a list
/// of action methods.
#[macro_export]
macro_rules! impl_controller {
    ($type:ty, $deps:ident, [$($action:ident),* $(,)?]) => {
        impl $crate::controller::Controller for $type {
            fn responds_to(&self, action: &str) -> bool {
                let actions: &[&str] = &[$(stringify!($action)),*];
                actions.contains(&action)
            }

            fn invoke(
                &mut self,
                action: &str,
                ctx: &mut $crate::controller::Context<'_>,
                params: &[String],
            ) -> $crate::controller::ActionResult {
                match action {
                    $(stringify!($action) => {
                        let run: $crate::controller::Action<Self> = Self::$action;
                        run(self, ctx, params)
                    })*
                    _ => Err(format!("{} has no action '{}'", stringify!($type), action).into()),
                }
            }

            fn dependencies(&self) -> &$crate::controller::Dependencies {
                &self.$deps
            }

            fn dependencies_mut(&mut self) -> &mut $crate::controller::Dependencies {
                &mut self.$deps
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pages {
        deps: Dependencies,
        visits: u32,
    }

    impl Pages {
        fn index(&mut self, ctx: &mut Context<'_>, _params: &[String]) -> ActionResult {
            self.visits += 1;
            ctx.write("index");
            Ok(())
        }

        fn show(&mut self, ctx: &mut Context<'_>, params: &[String]) -> ActionResult {
            ctx.write(&format!("show:{}", params.join(",")));
            Ok(())
        }

        fn fail(&mut self, _ctx: &mut Context<'_>, params: &[String]) -> ActionResult {
            let id: u32 = params.first().map(String::as_str).unwrap_or("").parse()?;
            Err(format!("page {} failed", id).into())
        }

        // Not listed as an action.
        #[allow(dead_code)]
        fn helper(&self) -> u32 {
            self.visits
        }
    }

    crate::impl_controller!(Pages, deps, [index, show, fail]);

    fn pages() -> Pages {
        Pages {
            deps: Dependencies::new(),
            visits: 0,
        }
    }

    #[test]
    fn test_responds_to_declared_actions_only() {
        let controller = pages();
        assert!(controller.responds_to("index"));
        assert!(controller.responds_to("show"));
        assert!(!controller.responds_to("helper"));
        assert!(!controller.responds_to(""));
    }

    #[test]
    fn test_invoke_passes_params() {
        let mut loader = Loader::for_tests();
        let mut out = String::new();
        let mut controller = pages();
        {
            let mut ctx = Context::new(&mut loader, &mut out);
            controller
                .invoke("show", &mut ctx, &["42".to_string(), "x".to_string()])
                .unwrap();
            controller.invoke("index", &mut ctx, &[]).unwrap();
        }
        assert_eq!(out, "show:42,xindex");
        assert_eq!(controller.visits, 1);
    }

    #[test]
    fn test_invoke_errors() {
        let mut loader = Loader::for_tests();
        let mut out = String::new();
        let mut controller = pages();
        let mut ctx = Context::new(&mut loader, &mut out);

        let parse = controller.invoke("fail", &mut ctx, &["abc".to_string()]);
        assert!(parse.is_err());
        let failed = controller.invoke("fail", &mut ctx, &["7".to_string()]);
        assert_eq!(failed.unwrap_err().to_string(), "page 7 failed");
        let unknown = controller.invoke("helper", &mut ctx, &[]);
        assert!(unknown.unwrap_err().to_string().contains("no action 'helper'"));
    }
}

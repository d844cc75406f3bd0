//! Components shipped with the framework and the sample application.

use serde::Serialize;

use crate::controller::{ActionResult, ActiveController, Context, Dependencies};
use crate::helpers::ucfirst;
use crate::loader::{Catalog, LoadError, Root};
use crate::view::view_data;

/// Framework defaults registered under the core root: the `Database`
/// library and the `ucfirst` helper.
pub fn core_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .library(Root::Core, "Database", |services| Ok(services.database()))
        .helper(Root::Core, "ucfirst", ucfirst);
    catalog
}

/// The sample application: a `Welcome` controller rendering the `Welcome`
/// view.
pub fn sample_app_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.controller(Root::App, "Welcome", Welcome::build);
    catalog
}

/// Core components followed by the sample application.
pub fn default_catalog() -> Catalog {
    let mut catalog = core_catalog();
    catalog.extend(sample_app_catalog());
    catalog
}

#[derive(Serialize)]
struct Greeting<'a> {
    firstname: &'a str,
    lastname: &'a str,
}

pub struct Welcome {
    deps: Dependencies,
}

impl Welcome {
    fn build(active: ActiveController<'_>) -> Result<Self, LoadError> {
        Ok(Self {
            deps: active.into_dependencies(),
        })
    }

    fn index(&mut self, ctx: &mut Context<'_>, params: &[String]) -> ActionResult {
        let firstname = params.first().map(String::as_str).unwrap_or("Cristopher");
        let lastname = params.get(1).map(String::as_str).unwrap_or("Gonzálvez");
        let data = view_data(&Greeting { firstname, lastname })?;
        ctx.view("Welcome", &data)?;
        Ok(())
    }
}

crate::impl_controller!(Welcome, deps, [index]);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{ComponentKind, ComponentPath, Definition};

    #[test]
    fn test_default_catalog_contents() {
        let catalog = default_catalog();

        let database = ComponentPath::new(Root::Core, ComponentKind::Library, "Database");
        let helper = ComponentPath::new(Root::Core, ComponentKind::Helper, "ucfirst");
        let welcome = ComponentPath::new(Root::App, ComponentKind::Controller, "Welcome");
        assert!(matches!(catalog.get(&database), Some(Definition::Library(_))));
        assert!(matches!(catalog.get(&welcome), Some(Definition::Controller(_))));
        match catalog.get(&helper) {
            Some(Definition::Helper(f)) => assert_eq!(f("welcome"), "Welcome"),
            other => panic!("Expected helper, got {:?}", other),
        }
        assert_eq!(catalog.len(), 3);
    }
}

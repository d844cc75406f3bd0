//! End-to-end dispatch over an on-disk app/core tree.
//!
//! Requests go through configuration loading, the loader and the router,
//! with models talking to a recording connector instead of a database.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use minimvc::cli::Args;
use minimvc::controller::{ActionResult, ActiveController, Context, Dependencies, Dependency};
use minimvc::db::{DbError, QueryResult, RecordingConnector};
use minimvc::view::view_data;
use minimvc::{
    Catalog, ComponentKind, Config, DispatchError, LoadError, Loader, Model, Request, Root, Router, Services,
};
use clap::Parser;
use rstest::{fixture, rstest};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;

#[derive(Debug, Deserialize, Serialize, PartialEq)]
struct Person {
    name: String,
    age: i64,
}

struct People {
    model: Model,
}

impl People {
    fn adults(&mut self) -> Result<Vec<Person>, DbError> {
        self.model
            .db_mut()
            .from("people")
            .where_eq("adult", "true")
            .select(["name", "age"])?
            .result_objects()
    }

    fn rename(&mut self, id: &str, name: &str) -> Result<u64, DbError> {
        let db = self.model.db_mut();
        db.from("people").where_eq("id", id).update([("name", name)])?;
        Ok(db.affected_rows())
    }
}

impl Dependency for People {
    fn connect(&mut self) -> Result<(), DbError> {
        self.model.connect()
    }
}

struct Users {
    deps: Dependencies,
}

impl Users {
    fn build(mut active: ActiveController<'_>) -> Result<Self, LoadError> {
        active.model("People", true)?;
        Ok(Self {
            deps: active.into_dependencies(),
        })
    }

    fn people(&mut self) -> Result<&mut People, String> {
        self.deps
            .get_mut::<People>("People")
            .ok_or_else(|| "People model not attached".to_string())
    }

    fn index(&mut self, ctx: &mut Context<'_>, _params: &[String]) -> ActionResult {
        let adults = self.people()?.adults()?;
        for person in adults {
            ctx.view("Person", &view_data(&person)?)?;
        }
        Ok(())
    }

    fn rename(&mut self, ctx: &mut Context<'_>, params: &[String]) -> ActionResult {
        let [id, name] = params else {
            return Err(format!("rename expects 2 params, got {}", params.len()).into());
        };
        let changed = self.people()?.rename(id, name)?;
        ctx.write(&format!("renamed {}", changed));
        Ok(())
    }
}

minimvc::impl_controller!(Users, deps, [index, rename]);

struct Home {
    deps: Dependencies,
}

impl Home {
    fn index(&mut self, ctx: &mut Context<'_>, params: &[String]) -> ActionResult {
        ctx.write(&format!("home({})", params.join(",")));
        Ok(())
    }
}

minimvc::impl_controller!(Home, deps, [index]);

struct Site {
    _dir: TempDir,
    core: PathBuf,
    app: PathBuf,
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[fixture]
fn site() -> Site {
    let dir = tempfile::tempdir().unwrap();
    let core = dir.path().join("core");
    let app = dir.path().join("app");

    write(
        &core.join("config/SystemConfig.ini"),
        &format!("[APP]\nPATH = {}\nDEFAULT_CONTROLLER = Welcome\n\n[DB]\nCHARSET = utf8\n", app.display()),
    );
    write(&app.join("config/App.ini"), "[APP]\nDEFAULT_CONTROLLER = Home\n");
    write(&app.join("config/Database.ini"), "[DB]\nDATABASE = shop\nCHARSET = latin1\n");
    write(&app.join("views/Person.html"), "<li>{{ name }} ({{ age }})</li>");

    Site {
        _dir: dir,
        core,
        app,
    }
}

fn router(site: &Site, connector: &RecordingConnector, catalog: Catalog) -> Router {
    let config = Config::load_layered(&site.core, None).unwrap();
    let services = Services::new(config, Arc::new(connector.clone()));
    Router::new(Loader::new(services, catalog).unwrap())
}

fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .controller(Root::App, "Users", Users::build)
        .controller(Root::App, "Home", |active| {
            Ok(Home {
                deps: active.into_dependencies(),
            })
        })
        .model(Root::App, "People", |services| {
            Ok(People {
                model: Model::from_services(services),
            })
        });
    catalog
}

fn people_result() -> QueryResult {
    QueryResult {
        headers: vec!["name".to_string(), "age".to_string()],
        rows: vec![vec![json!("Ana"), json!(31)], vec![json!("Bo"), json!(45)]],
        affected: 0,
    }
}

#[rstest]
fn test_index_renders_rows_through_view(site: Site) {
    let connector = RecordingConnector::new();
    connector.push_result(people_result());
    let mut router = router(&site, &connector, catalog());

    let mut out = String::new();
    let dispatched = router.dispatch(&Request::parse("/users"), &mut out).unwrap();

    assert_eq!(dispatched.controller, "Users");
    assert_eq!(dispatched.method, "index");
    assert_eq!(out, "<li>Ana (31)</li><li>Bo (45)</li>");
    assert_eq!(
        connector.executed_sql(),
        vec!["SELECT name, age FROM people WHERE adult = $1"]
    );
    // Database.ini overrides the system charset.
    assert_eq!(connector.charsets(), vec!["latin1"]);
    assert_eq!(connector.connects(), 1);
}

#[rstest]
fn test_params_are_passed_in_order(site: Site) {
    let connector = RecordingConnector::new();
    connector.push_result(QueryResult::affected(1));
    let mut router = router(&site, &connector, catalog());

    let mut out = String::new();
    router
        .dispatch(&Request::parse("/Users/rename/42/Cleo"), &mut out)
        .unwrap();

    assert_eq!(out, "renamed 1");
    let statements = connector.statements();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].sql, "UPDATE people SET name = $1 WHERE id = $2");
    assert_eq!(statements[0].params, vec!["Cleo", "42"]);
}

#[rstest]
#[case("", "home()")]
#[case("/Missing/show/1/2", "home(1,2)")]
#[case("/Home/nothing/x", "home(x)")]
fn test_app_default_controller_overrides_core(site: Site, #[case] path: &str, #[case] expected: &str) {
    let connector = RecordingConnector::new();
    let mut router = router(&site, &connector, catalog());

    let mut out = String::new();
    let dispatched = router.dispatch(&Request::parse(path), &mut out).unwrap();

    assert_eq!(dispatched.controller, "Home");
    assert_eq!(out, expected);
    assert!(connector.executed_sql().is_empty());
}

#[rstest]
fn test_models_load_once_but_build_per_controller(site: Site) {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let mut catalog = catalog();
    catalog.on_load(
        minimvc::loader::ComponentPath::new(Root::App, ComponentKind::Model, "People"),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    let connector = RecordingConnector::new();
    let mut router = router(&site, &connector, catalog);
    for _ in 0..2 {
        let mut out = String::new();
        router.dispatch(&Request::parse("/Users"), &mut out).unwrap();
    }

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(connector.connects(), 2);
}

#[rstest]
fn test_refused_connection_fails_the_request(site: Site) {
    let connector = RecordingConnector::refusing("server down");
    let mut router = router(&site, &connector, catalog());

    let mut out = String::new();
    let err = router.dispatch(&Request::parse("/Users"), &mut out).unwrap_err();
    match &err {
        DispatchError::Load {
            controller,
            source: LoadError::Connect { name, source },
        } => {
            assert_eq!(controller, "Users");
            assert_eq!(name, "People");
            assert!(matches!(source, DbError::ConnectionFailed { .. }));
        }
        other => panic!("Expected a connect failure, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 1);
    assert!(out.is_empty());

    // Controllers without a database dependency still work.
    let dispatched = router.dispatch(&Request::parse("/Home"), &mut out).unwrap();
    assert_eq!(dispatched.controller, "Home");
    assert!(!dispatched.used_default_controller);
}

#[test]
fn test_bundled_sample_app_dry_run() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let core = root.join("core");
    let app = root.join("app");
    let args = Args::try_parse_from([
        "minimvc",
        "/Welcome/index/Ada/Lovelace",
        "--dry-run",
        "--core-path",
        core.to_str().unwrap(),
        "--app-path",
        app.to_str().unwrap(),
    ])
    .unwrap();

    let response = args.run().unwrap();
    assert!(response.body.contains("Welcome, Ada Lovelace!"));
    assert!(response.recorded.is_empty());
}

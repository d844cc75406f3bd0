//! CLI argument definitions and the single-request entry point.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::bundled::default_catalog;
use crate::config::{Config, ConfigError};
use crate::db::{Connector, PostgresConnector, RecordingConnector};
use crate::loader::{Loader, Services};
use crate::request::Request;
use crate::router::{DispatchError, Router};

/// Environment variable holding the request path when none is given.
pub const PATH_INFO_VAR: &str = "PATH_INFO";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Request path, e.g. /Users/show/42 (defaults to $PATH_INFO)
    pub path: Option<String>,

    /// Framework directory containing config/SystemConfig.ini
    #[arg(long, default_value = "./core")]
    pub core_path: PathBuf,

    /// Application directory, overriding [APP] PATH
    #[arg(long)]
    pub app_path: Option<PathBuf>,

    /// Record SQL statements instead of connecting to the database
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) => 2,
            CliError::Dispatch(e) => e.exit_code(),
        }
    }
}

/// Result of handling one request.
#[derive(Debug, Default)]
pub struct Response {
    pub body: String,
    /// Statements recorded in dry-run mode.
    pub recorded: Vec<String>,
}

impl Args {
    /// Default `env_logger` filter for the requested verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// The request to dispatch: the positional path, else `PATH_INFO`.
    pub fn request(&self) -> Request {
        match &self.path {
            Some(path) => Request::parse(path),
            None => Request::from_path_info(std::env::var(PATH_INFO_VAR).ok().as_deref()),
        }
    }

    /// Load the configuration and dispatch the request.
    pub fn run(&self) -> Result<Response, CliError> {
        let config = Config::load_layered(&self.core_path, self.app_path.as_deref())?;

        let recorder = self.dry_run.then(RecordingConnector::new);
        let connector: Arc<dyn Connector> = match &recorder {
            Some(recorder) => Arc::new(recorder.clone()),
            None => Arc::new(PostgresConnector),
        };

        let loader = Loader::new(Services::new(config, connector), default_catalog())?;
        let mut router = Router::new(loader);
        let request = self.request();

        let mut body = String::new();
        let dispatched = router.dispatch(&request, &mut body)?;
        log::info!(
            "Handled /{} with {}::{}",
            request.to_path(),
            dispatched.controller,
            dispatched.method
        );

        Ok(Response {
            body,
            recorded: recorder.map(|r| r.executed_sql()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serial_test::serial;

    #[rstest]
    #[case(&["minimvc"], None, "./core", false, 0)]
    #[case(&["minimvc", "/Users/show/42", "--dry-run", "-vv"], Some("/Users/show/42"), "./core", true, 2)]
    #[case(&["minimvc", "--core-path", "/srv/core", "Welcome"], Some("Welcome"), "/srv/core", false, 0)]
    fn test_parse_args(
        #[case] argv: &[&str],
        #[case] path: Option<&str>,
        #[case] core_path: &str,
        #[case] dry_run: bool,
        #[case] verbose: u8,
    ) {
        let args = Args::try_parse_from(argv.iter().copied()).unwrap();
        assert_eq!(args.path.as_deref(), path);
        assert_eq!(args.core_path, PathBuf::from(core_path));
        assert_eq!(args.dry_run, dry_run);
        assert_eq!(args.verbose, verbose);
        assert!(args.app_path.is_none());
    }

    #[rstest]
    #[case(0, "warn")]
    #[case(1, "info")]
    #[case(2, "debug")]
    #[case(5, "trace")]
    fn test_log_filter(#[case] verbose: u8, #[case] expected: &str) {
        let mut args = Args::try_parse_from(["minimvc"]).unwrap();
        args.verbose = verbose;
        assert_eq!(args.log_filter(), expected);
    }

    #[test]
    #[serial]
    fn test_request_falls_back_to_path_info() {
        let args = Args::try_parse_from(["minimvc"]).unwrap();

        unsafe { std::env::set_var(PATH_INFO_VAR, "/Users/show/42") };
        let request = args.request();
        unsafe { std::env::remove_var(PATH_INFO_VAR) };

        assert_eq!(request.controller(), "Users");
        assert_eq!(request.method(), "show");
        assert_eq!(request.params(), &["42".to_string()]);
    }

    #[test]
    #[serial]
    fn test_request_prefers_positional_path() {
        let args = Args::try_parse_from(["minimvc", "/Pages"]).unwrap();

        unsafe { std::env::set_var(PATH_INFO_VAR, "/Users/show/42") };
        let request = args.request();
        unsafe { std::env::remove_var(PATH_INFO_VAR) };

        assert_eq!(request.controller(), "Pages");
        assert_eq!(request.method(), "");
    }

    #[test]
    fn test_missing_system_config_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::try_parse_from([
            "minimvc",
            "--core-path",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();

        let err = args.run().unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::ReadFailed { .. })));
        assert_eq!(err.exit_code(), 2);
    }
}

//! Database connection settings.
//!
//! Settings come from the `[DB]` section of the layered configuration. A
//! `DATABASE_URL` environment variable takes precedence over the ini values.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Section holding the database settings.
pub const DB_SECTION: &str = "DB";

const DEFAULT_CHARSET: &str = "utf8";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection string; when set, the individual fields are ignored.
    pub url: Option<String>,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub charset: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            server: None,
            port: None,
            username: None,
            password: None,
            database: None,
            charset: DEFAULT_CHARSET.to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Read the `[DB]` section. A non-numeric `PORT` is ignored with a warning.
    pub fn from_config(config: &Config) -> Self {
        let get = |property: &str| config.get(DB_SECTION, property).map(str::to_string);

        let port = config.get(DB_SECTION, "PORT").and_then(|raw| match raw.parse() {
            Ok(port) => Some(port),
            Err(_) => {
                log::warn!("Ignoring invalid [DB] PORT value '{}'", raw);
                None
            }
        });

        Self {
            url: get("URL"),
            server: get("SERVER"),
            port,
            username: get("USERNAME"),
            password: get("PASSWORD"),
            database: get("DATABASE"),
            charset: get("CHARSET").unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
        }
    }

    /// Load from the `DATABASE_URL` environment variable, if set.
    pub fn from_env() -> Option<String> {
        std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty())
    }

    /// Resolve settings from config and environment.
    ///
    /// Priority: Environment (`DATABASE_URL`) > `[DB] URL` > individual fields.
    pub fn resolve(config: &Config) -> Self {
        let mut settings = Self::from_config(config);
        if let Some(url) = Self::from_env() {
            settings.url = Some(url);
        }
        settings
    }
}

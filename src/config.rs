//! Layered ini configuration.
//!
//! Settings are read from up to three ini files, in this order:
//!
//! 1. `<core>/config/SystemConfig.ini` - framework defaults (required)
//! 2. `<app>/config/App.ini` - application overrides (optional)
//! 3. `<app>/config/Database.ini` - database credentials (optional)
//!
//! Later files overwrite earlier ones key-by-key within the same section, so an
//! application only needs to repeat the properties it changes.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

/// Section holding the application settings.
pub const APP_SECTION: &str = "APP";
/// Section holding the framework settings.
pub const CORE_SECTION: &str = "CORE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    ReadFailed { path: String, message: String },

    #[error("Invalid ini syntax in '{origin}' at line {line}: {message}")]
    Parse {
        origin: String,
        line: usize,
        message: String,
    },

    #[error("Missing required property [{section}] {property}")]
    Missing { section: String, property: String },
}

/// Section → property → value lookup table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the framework defaults, then the application overrides.
    ///
    /// # Arguments
    /// * `core_path` - Directory containing the framework's `config/` folder
    /// * `app_override` - Application directory to use instead of `[APP] PATH`
    ///
    /// # Errors
    /// Returns an error if the system config cannot be read or parsed, or if no
    /// application path is known. Missing application files are skipped.
    pub fn load_layered(core_path: &Path, app_override: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        config.load_file(&core_path.join("config").join("SystemConfig.ini"))?;

        if config.get(CORE_SECTION, "PATH").is_none() {
            config.set(CORE_SECTION, "PATH", core_path.display().to_string());
        }
        if let Some(app_path) = app_override {
            config.set(APP_SECTION, "PATH", app_path.display().to_string());
        }

        let app_path = PathBuf::from(config.require(APP_SECTION, "PATH")?);
        for file in ["App.ini", "Database.ini"] {
            let path = app_path.join("config").join(file);
            if path.is_file() {
                config.load_file(&path)?;
            } else {
                log::warn!("Skipping missing config file {}", path.display());
            }
        }

        Ok(config)
    }

    /// Merge an ini file into this configuration.
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::debug!("Loading config file {}", path.display());
        self.merge_str(&content, &path.display().to_string())
    }

    /// Merge ini text into this configuration.
    ///
    /// `origin` only appears in error messages.
    pub fn merge_str(&mut self, source: &str, origin: &str) -> Result<(), ConfigError> {
        let mut section: Option<String> = None;

        for (index, raw_line) in source.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let parse_error = |message: &str| ConfigError::Parse {
                origin: origin.to_string(),
                line: index + 1,
                message: message.to_string(),
            };

            if let Some(header) = line.strip_prefix('[') {
                let Some(name) = header.strip_suffix(']') else {
                    return Err(parse_error("unterminated section header"));
                };
                let name = name.trim();
                if name.is_empty() {
                    return Err(parse_error("empty section name"));
                }
                section = Some(name.to_string());
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(parse_error("expected 'key = value'"));
            };
            let Some(current) = section.as_deref() else {
                return Err(parse_error("property outside of a section"));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(parse_error("empty property name"));
            }

            self.set(current, key, unquote(value.trim()));
        }

        Ok(())
    }

    /// Look up a property. Absent and empty values both yield `None`.
    pub fn get(&self, section: &str, property: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|props| props.get(property))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Look up a property that must be present.
    pub fn require(&self, section: &str, property: &str) -> Result<&str, ConfigError> {
        self.get(section, property).ok_or_else(|| ConfigError::Missing {
            section: section.to_string(),
            property: property.to_string(),
        })
    }

    pub fn set(&mut self, section: &str, property: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(property.to_string(), value.into());
    }

    /// Application root directory (`[APP] PATH`).
    pub fn app_path(&self) -> Option<PathBuf> {
        self.get(APP_SECTION, "PATH").map(PathBuf::from)
    }

    /// Framework root directory (`[CORE] PATH`).
    pub fn core_path(&self) -> Option<PathBuf> {
        self.get(CORE_SECTION, "PATH").map(PathBuf::from)
    }

    /// Logical name of the controller used when a request names none.
    pub fn default_controller(&self) -> Option<&str> {
        self.get(APP_SECTION, "DEFAULT_CONTROLLER")
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn write_ini(dir: &Path, name: &str, content: &str) {
        let config_dir = dir.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(name), content).unwrap();
    }

    #[test]
    fn test_merge_sections_and_properties() {
        let mut config = Config::new();
        config
            .merge_str("[APP]\nPATH = ./app\nDEFAULT_CONTROLLER = Welcome\n", "inline")
            .unwrap();

        assert_eq!(config.get("APP", "PATH"), Some("./app"));
        assert_eq!(config.default_controller(), Some("Welcome"));
        assert_eq!(config.get("APP", "MISSING"), None);
        assert_eq!(config.get("NOPE", "PATH"), None);
    }

    #[rstest]
    #[case("KEY = \"quoted value\"", "quoted value")]
    #[case("KEY = 'single'", "single")]
    #[case("KEY = bare", "bare")]
    #[case("KEY=tight", "tight")]
    #[case("KEY = a=b", "a=b")]
    fn test_value_forms(#[case] line: &str, #[case] expected: &str) {
        let mut config = Config::new();
        config.merge_str(&format!("[S]\n{}", line), "inline").unwrap();
        assert_eq!(config.get("S", "KEY"), Some(expected));
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let mut config = Config::new();
        config
            .merge_str("; comment\n\n# another\n[DB]\nSERVER = localhost\n", "inline")
            .unwrap();
        assert_eq!(config.get("DB", "SERVER"), Some("localhost"));
    }

    #[test]
    fn test_empty_value_reads_as_none() {
        let mut config = Config::new();
        config.merge_str("[DB]\nPASSWORD =\n", "inline").unwrap();
        assert_eq!(config.get("DB", "PASSWORD"), None);
    }

    #[rstest]
    #[case("KEY = value", 1)]
    #[case("[S]\nno equals sign", 2)]
    #[case("[unterminated\nKEY = 1", 1)]
    fn test_parse_errors_report_line(#[case] source: &str, #[case] expected_line: usize) {
        let mut config = Config::new();
        match config.merge_str(source, "bad.ini") {
            Err(ConfigError::Parse { line, origin, .. }) => {
                assert_eq!(line, expected_line);
                assert_eq!(origin, "bad.ini");
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_later_merge_overwrites_key_by_key() {
        let mut config = Config::new();
        config.merge_str("[APP]\nA = 1\nB = 2\n", "first").unwrap();
        config.merge_str("[APP]\nB = 3\n", "second").unwrap();

        assert_eq!(config.get("APP", "A"), Some("1"));
        assert_eq!(config.get("APP", "B"), Some("3"));
    }

    #[test]
    fn test_load_layered_applies_app_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        let core = temp_dir.path().join("core");
        let app = temp_dir.path().join("app");

        write_ini(
            &core,
            "SystemConfig.ini",
            &format!(
                "[APP]\nPATH = {}\nDEFAULT_CONTROLLER = Welcome\n[DB]\nCHARSET = utf8\n",
                app.display()
            ),
        );
        write_ini(&app, "App.ini", "[APP]\nDEFAULT_CONTROLLER = Home\n");
        write_ini(&app, "Database.ini", "[DB]\nSERVER = db.local\n");

        let config = Config::load_layered(&core, None).unwrap();

        assert_eq!(config.default_controller(), Some("Home"));
        assert_eq!(config.get("DB", "SERVER"), Some("db.local"));
        assert_eq!(config.get("DB", "CHARSET"), Some("utf8"));
        assert_eq!(config.core_path(), Some(core.clone()));
        assert_eq!(config.app_path(), Some(app));
    }

    #[test]
    fn test_load_layered_skips_missing_app_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let core = temp_dir.path().join("core");
        write_ini(&core, "SystemConfig.ini", "[APP]\nDEFAULT_CONTROLLER = Welcome\n");

        let config = Config::load_layered(&core, Some(&temp_dir.path().join("nowhere"))).unwrap();
        assert_eq!(config.default_controller(), Some("Welcome"));
    }

    #[test]
    fn test_load_layered_requires_app_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let core = temp_dir.path().join("core");
        write_ini(&core, "SystemConfig.ini", "[APP]\nDEFAULT_CONTROLLER = Welcome\n");

        let result = Config::load_layered(&core, None);
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_load_layered_missing_system_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = Config::load_layered(temp_dir.path(), None);
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }
}

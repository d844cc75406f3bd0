//! Template rendering by variable substitution.
//!
//! A view is a text file containing `{{ name }}` placeholders. Rendering
//! replaces each placeholder with the value of the same-named entry in the
//! data mapping; placeholders without an entry render as nothing.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Name → value mapping handed to a view.
pub type ViewData = IndexMap<String, String>;

/// File extension of view templates.
pub const VIEW_EXTENSION: &str = "html";

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Failed to read view '{path}': {message}")]
    ReadFailed { path: String, message: String },

    #[error("View data must serialize to an object, got {found}")]
    NotAnObject { found: String },

    #[error("Failed to serialize view data: {message}")]
    Serialize { message: String },
}

/// Matches `{{ name }}` placeholders.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    name: String,
    template: String,
}

impl View {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Read a template from disk.
    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self, ViewError> {
        let template = fs::read_to_string(path).map_err(|e| ViewError::ReadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(name, template))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitute every placeholder and return the output.
    pub fn render(&self, data: &ViewData) -> String {
        PLACEHOLDER
            .replace_all(&self.template, |caps: &Captures| match data.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    log::debug!("View '{}' references unset variable '{}'", self.name, &caps[1]);
                    String::new()
                }
            })
            .into_owned()
    }

    /// Render and append to `out`.
    pub fn render_into(&self, data: &ViewData, out: &mut String) {
        out.push_str(&self.render(data));
    }
}

/// Build view data from any value serializing to a flat object.
///
/// Strings are used as-is, `null` becomes an empty string and every other
/// value is written as JSON text.
pub fn view_data<T: Serialize>(value: &T) -> Result<ViewData, ViewError> {
    let json = serde_json::to_value(value).map_err(|e| ViewError::Serialize {
        message: e.to_string(),
    })?;
    let Value::Object(fields) = json else {
        return Err(ViewError::NotAnObject {
            found: json.to_string(),
        });
    };

    Ok(fields
        .into_iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (name, text)
        })
        .collect())
}

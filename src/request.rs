//! Request path parsing.
//!
//! A raw path such as `/Users/show/42` is split into the controller to load,
//! the method to call on it, and the positional parameters passed to that
//! method. Segment contents are not validated here; the loader rejects names
//! it cannot resolve.

use serde::Serialize;

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// A parsed request: which controller, which method, which arguments.
///
/// An empty `controller` means "use the default controller" and an empty
/// `method` means "call `index`".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Request {
    controller: String,
    method: String,
    params: Vec<String>,
}

impl Request {
    /// Parse a raw request path.
    ///
    /// One leading separator is stripped and empty segments are dropped, so
    /// `""`, `"/"` and `"//"` all parse to an empty request.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.strip_prefix(SEPARATOR).unwrap_or(raw);
        let mut segments = trimmed
            .split(SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);

        let controller = segments.next().unwrap_or_default();
        let method = segments.next().unwrap_or_default();
        let params = segments.collect();

        Self {
            controller,
            method,
            params,
        }
    }

    /// Parse an optional `PATH_INFO`-style value; absent means empty.
    pub fn from_path_info(path_info: Option<&str>) -> Self {
        Self::parse(path_info.unwrap_or_default())
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Join the segments back into a path without the leading separator.
    pub fn to_path(&self) -> String {
        [self.controller.as_str(), self.method.as_str()]
            .into_iter()
            .chain(self.params.iter().map(String::as_str))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string())
    }
}

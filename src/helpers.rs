//! Helper functions bundled with the framework.

/// Uppercase the first character, leaving the rest untouched.
pub fn ucfirst(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

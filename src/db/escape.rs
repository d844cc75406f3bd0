//! SQL literal quoting.

/// Escape a value for use inside a single-quoted SQL string literal.
///
/// Embedded single quotes are doubled, which is the standard SQL escape and
/// what PostgreSQL expects with `standard_conforming_strings` on.
pub fn escape_literal(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        if c == '\'' {
            result.push('\'');
        }
        result.push(c);
    }
    result
}

/// Wrap an escaped value in single quotes.
#[inline]
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", escape_literal(s))
}

/// Wrap a value in single quotes without escaping anything.
///
/// Reproduces the original framework's interpolation. Embedded quotes end the
/// literal early, so only use this for compatibility testing.
#[inline]
pub fn quote_verbatim(s: &str) -> String {
    format!("'{}'", s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hello", "hello")]
    #[case("O'Brien", "O''Brien")]
    #[case("''", "''''")]
    #[case(r"back\slash", r"back\slash")]
    fn test_escape_literal(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_literal(input), expected);
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_quote_verbatim_leaves_quotes_alone() {
        assert_eq!(quote_verbatim("x' OR '1'='1"), "'x' OR '1'='1'");
    }
}

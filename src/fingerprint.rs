//! Stable content fingerprints for conversion requests.
//!
//! URL sources hash the URL verbatim. Text sources hash a normalized form:
//! lines trimmed, blank lines dropped, remaining lines sorted. Two texts
//! that differ only in line order or surrounding whitespace therefore share
//! a fingerprint.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::source::Source;

/// Lowercase hex SHA-256 of a normalized conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of a source.
    #[must_use]
    pub fn of(source: &Source) -> Self {
        let material = match source {
            Source::Url(url) => format!("url:{url}"),
            Source::Text(text) => format!("text:{}", normalize_text(text)),
        };
        Self(format!("{:x}", Sha256::digest(material.as_bytes())))
    }

    /// Wraps a previously computed fingerprint (e.g. one read from storage).
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Returns the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shorthand for [`Fingerprint::of`].
#[must_use]
pub fn fingerprint(source: &Source) -> Fingerprint {
    Fingerprint::of(source)
}

/// Trims lines, drops blank ones, sorts the rest and joins with `\n`.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let mut lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    lines.sort_unstable();
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Fingerprint {
        Fingerprint::of(&Source::Text(s.to_string()))
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let fp = Fingerprint::of(&Source::Url("https://example.com/sub".to_string()));
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_url_fingerprint_matches_known_digest() {
        // sha256("url:a")
        let fp = Fingerprint::of(&Source::Url("a".to_string()));
        assert_eq!(
            fp.as_str(),
            format!("{:x}", Sha256::digest(b"url:a"))
        );
    }

    #[test]
    fn test_text_fingerprint_ignores_order_and_whitespace() {
        assert_eq!(text("b\na\n"), text("  a  \n\n\tb\r\n"));
    }

    #[test]
    fn test_text_fingerprint_is_content_sensitive() {
        assert_ne!(text("a\nb"), text("a\nc"));
    }

    #[test]
    fn test_url_and_text_with_same_value_differ() {
        let url = Fingerprint::of(&Source::Url("x".to_string()));
        assert_ne!(url, text("x"));
    }

    #[test]
    fn test_normalize_text_sorts_and_drops_blank_lines() {
        assert_eq!(normalize_text("  c\n\na \n b"), "a\nb\nc");
    }
}

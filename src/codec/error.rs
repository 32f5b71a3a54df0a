//! Error types for URI decoding.

use thiserror::Error;

/// Errors raised while decoding a single proxy URI.
///
/// Feed parsing treats these as per-line failures: the offending line is
/// skipped and the rest of the feed is still decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The line does not start with a supported scheme.
    #[error("unsupported scheme in '{preview}'\n  Suggestion: Only ss://, vmess:// and trojan:// links are converted")]
    UnsupportedScheme {
        /// Leading characters of the rejected line.
        preview: String,
    },

    /// A base64 section could not be decoded with either alphabet.
    #[error("invalid base64 in {protocol} URI")]
    InvalidBase64 {
        /// Protocol tag of the URI.
        protocol: &'static str,
    },

    /// The vmess body is not a JSON object.
    #[error("invalid {protocol} JSON: {reason}")]
    InvalidJson {
        /// Protocol tag of the URI.
        protocol: &'static str,
        /// Parser message.
        reason: String,
    },

    /// A required URI section is missing.
    #[error("invalid {protocol} URI: {reason}")]
    Malformed {
        /// Protocol tag of the URI.
        protocol: &'static str,
        /// What is missing.
        reason: &'static str,
    },

    /// The port is not a number in `0..=65535`.
    #[error("invalid port '{value}' in {protocol} URI")]
    InvalidPort {
        /// Protocol tag of the URI.
        protocol: &'static str,
        /// The rejected port text.
        value: String,
    },
}

impl DecodeError {
    /// Creates an `UnsupportedScheme` error with a bounded preview of the line.
    #[must_use]
    pub fn unsupported_scheme(line: &str) -> Self {
        Self::UnsupportedScheme {
            preview: line.chars().take(50).collect(),
        }
    }
}

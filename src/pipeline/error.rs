//! Error types surfaced by conversion requests.

use thiserror::Error;

use crate::document::DocumentError;
use crate::fetch::FetchError;
use crate::store::StoreError;

/// Errors returned by conversion pipelines and the services built on them.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input decoded to zero convertible proxies.
    #[error("no valid proxies found\n  Suggestion: Check that the source lists ss://, vmess:// or trojan:// proxies")]
    NoValidEntries,

    /// The remote source could not be fetched.
    #[error("failed to fetch source: {0}")]
    Fetch(#[from] FetchError),

    /// The input is neither a valid document nor a usable feed.
    #[error("unrecognized content format (as document: {document}; as feed: {feed})")]
    FormatAmbiguous {
        /// Why document parsing failed.
        document: String,
        /// Why feed parsing failed.
        feed: String,
    },

    /// Document parsing or serialization failed.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Durable storage failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The request itself is unusable (empty URL or text, bad URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No artifact with this id exists.
    #[error("artifact not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_valid_entries_message() {
        let msg = ConvertError::NoValidEntries.to_string();
        assert!(msg.starts_with("no valid proxies found"));
        assert!(msg.contains("Suggestion"));
    }

    #[test]
    fn test_format_ambiguous_names_both_reasons() {
        let err = ConvertError::FormatAmbiguous {
            document: "bad yaml".to_string(),
            feed: "no lines".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bad yaml"));
        assert!(msg.contains("no lines"));
    }
}

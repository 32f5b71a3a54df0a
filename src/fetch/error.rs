//! Error types for remote subscription fetches.

use thiserror::Error;

/// Errors that can occur while fetching a remote source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS, ...).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not finish within the configured timeout.
    #[error("timeout fetching {url}\n  Suggestion: Raise fetch_timeout_secs in the config file if the provider is slow")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The server answered with a status other than 200.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Classifies a reqwest error for `url`.
    #[must_use]
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                source,
            }
        }
    }
}

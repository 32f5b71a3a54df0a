//! Remote source fetching.
//!
//! [`Fetcher`] is the seam the cache service fetches URL sources through.
//! [`HttpFetcher`] is the reqwest implementation: permissive TLS, fixed
//! browser User-Agent, per-request timeout.

mod error;
mod http;

pub use error::FetchError;
pub use http::{DEFAULT_FETCH_TIMEOUT, HttpFetcher};

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

/// Status and body of a fetched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Fetches remote sources.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, giving up after `timeout`.
    ///
    /// Any HTTP status is returned as a response; only transport failures
    /// are errors.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError>;
}

/// Fetches `url` and returns the body of a 200 response.
///
/// # Errors
///
/// Returns [`FetchError::HttpStatus`] for any status other than 200, or the
/// fetcher's transport error.
#[instrument(skip(fetcher, timeout))]
pub async fn fetch_body(
    fetcher: &dyn Fetcher,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    let response = fetcher.fetch(url, timeout).await?;
    if response.status != 200 {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }
    debug!(bytes = response.body.len(), "Fetched source");
    Ok(response.body)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct FixedFetcher(u16);

    #[async_trait]
    impl Fetcher for FixedFetcher {
        async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<FetchResponse, FetchError> {
            Ok(FetchResponse {
                status: self.0,
                body: "body".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_body_returns_ok_body() {
        let body = fetch_body(&FixedFetcher(200), "https://x", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(body, "body");
    }

    #[tokio::test]
    async fn test_fetch_body_rejects_non_200() {
        let err = fetch_body(&FixedFetcher(204), "https://x", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { status: 204, .. }));
    }
}

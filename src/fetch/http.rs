//! reqwest-backed [`Fetcher`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{FetchError, FetchResponse, Fetcher};
use crate::user_agent::DEFAULT_USER_AGENT;

/// Default per-request timeout for subscription fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout; the overall timeout is passed per request.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP fetcher for subscription sources.
///
/// Certificate validation is disabled: subscription URLs are pasted by
/// users and routinely sit behind self-signed certificates.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default browser User-Agent.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the TLS backend cannot be set up.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Creates a fetcher sending `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the TLS backend cannot be set up.
    pub fn with_user_agent(user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .danger_accept_invalid_certs(true)
            .gzip(true)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self), fields(timeout_secs = timeout.as_secs()))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!(status, bytes = body.len(), "Response received");

        Ok(FetchResponse { status, body })
    }
}

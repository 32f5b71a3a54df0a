//! Caller-facing conversion operations.
//!
//! [`ConversionService`] is what an HTTP layer or the CLI talks to. It
//! validates requests and delegates to the [`CacheService`] it owns.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::artifact::{ArtifactId, ArtifactKind, ConversionArtifact};
use crate::cache::{CacheOptions, CacheService};
use crate::db::{Database, DatabaseOptions, DbError};
use crate::fetch::{FetchError, HttpFetcher};
use crate::pipeline::ConvertError;
use crate::source::Source;
use crate::store::SqliteStore;
use crate::user_agent::DEFAULT_USER_AGENT;

/// Errors raised while assembling a [`ConversionService`].
#[derive(Debug, Error)]
pub enum OpenError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Everything needed to open a service backed by SQLite and HTTP.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Database file; `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    pub database: DatabaseOptions,
    pub cache: CacheOptions,
    pub user_agent: String,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            db_path: None,
            database: DatabaseOptions::default(),
            cache: CacheOptions::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Conversion entry points: create, serve, list and prune artifacts.
#[derive(Debug, Clone)]
pub struct ConversionService {
    cache: CacheService,
}

impl ConversionService {
    /// Wraps an existing cache.
    #[must_use]
    pub fn new(cache: CacheService) -> Self {
        Self { cache }
    }

    /// Opens the database, builds the HTTP fetcher and the cache.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError`] if the database cannot be opened or migrated,
    /// or the HTTP client cannot be built.
    #[instrument(skip(options), fields(db = ?options.db_path))]
    pub async fn open(options: &ServiceOptions) -> Result<Self, OpenError> {
        let db = match &options.db_path {
            Some(path) => Database::with_options(path, options.database).await?,
            None => Database::new_in_memory().await?,
        };
        let fetcher = HttpFetcher::with_user_agent(&options.user_agent)?;
        let cache = CacheService::new(
            Arc::new(SqliteStore::new(db)),
            Arc::new(fetcher),
            options.cache,
        );
        Ok(Self::new(cache))
    }

    /// Returns the underlying cache.
    #[must_use]
    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    /// Converts a structured document (or anything resolvable to one) into a
    /// feed artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidRequest`] for an unusable source, or
    /// any fetch, conversion or storage error.
    pub async fn convert(&self, source: Source) -> Result<Arc<ConversionArtifact>, ConvertError> {
        source.validate()?;
        let artifact = self.cache.get_or_create(ArtifactKind::Feed, source).await?;
        info!(id = %artifact.id, proxies = artifact.proxy_count, "Feed ready");
        Ok(artifact)
    }

    /// Converts a feed (or a document, passed through) into a complete
    /// structured-document artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidRequest`] for an unusable source, or
    /// any fetch, conversion or storage error.
    pub async fn to_structured(
        &self,
        source: Source,
    ) -> Result<Arc<ConversionArtifact>, ConvertError> {
        source.validate()?;
        let artifact = self
            .cache
            .get_or_create(ArtifactKind::Document, source)
            .await?;
        info!(id = %artifact.id, proxies = artifact.proxy_count, "Document ready");
        Ok(artifact)
    }

    /// Returns the current feed payload for `id`, or `None` if there is no
    /// feed artifact with that id.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Store`] if the store lookup fails.
    pub async fn serve_feed(&self, id: &str) -> Result<Option<String>, ConvertError> {
        Ok(self
            .cache
            .serve(ArtifactKind::Feed, &ArtifactId::from(id.trim()))
            .await?)
    }

    /// Returns the current document payload for `id` (an optional `.yaml`
    /// suffix is accepted), or `None` if there is no document artifact with
    /// that id.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Store`] if the store lookup fails.
    pub async fn serve_document(&self, id: &str) -> Result<Option<String>, ConvertError> {
        let id = id.trim();
        let id = id.strip_suffix(".yaml").unwrap_or(id);
        Ok(self
            .cache
            .serve(ArtifactKind::Document, &ArtifactId::from(id))
            .await?)
    }

    /// Lists every artifact, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Store`] if the store cannot be read.
    pub async fn list_artifacts(&self) -> Result<Vec<Arc<ConversionArtifact>>, ConvertError> {
        Ok(self.cache.list().await?)
    }

    /// Deletes artifacts that lost their fingerprint mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Store`] if the store cannot be read or written.
    pub async fn prune_orphans(&self) -> Result<Vec<ArtifactId>, ConvertError> {
        Ok(self.cache.prune_orphans().await?)
    }

    /// Waits for background refreshes started by earlier calls.
    pub async fn wait_for_refreshes(&self) {
        self.cache.wait_for_refreshes().await;
    }
}

//! Durable artifact storage.
//!
//! [`ArtifactStore`] is the seam between the cache service and whatever
//! keeps artifacts across restarts. [`SqliteStore`] is the production
//! implementation; [`MemoryStore`] keeps everything in process memory.

mod error;
mod memory;
mod sqlite;

pub use error::{StoreDbErrorKind, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::artifact::{ArtifactId, ArtifactKind, ConversionArtifact};
use crate::fingerprint::Fingerprint;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Data-access contract for conversion artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upserts an artifact and points its `(kind, fingerprint)` mapping at
    /// it, as one all-or-nothing unit.
    async fn put(&self, artifact: &ConversionArtifact) -> Result<()>;

    /// Overwrites payload, count and update time of an existing artifact.
    /// The fingerprint mapping is left alone.
    async fn update_content(&self, artifact: &ConversionArtifact) -> Result<()>;

    /// Reads one artifact.
    async fn get(&self, id: &ArtifactId) -> Result<Option<ConversionArtifact>>;

    /// Reads every artifact, oldest first.
    async fn list(&self) -> Result<Vec<ConversionArtifact>>;

    /// Returns the artifact id the durable mapping points at.
    async fn lookup_fingerprint(
        &self,
        kind: ArtifactKind,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ArtifactId>>;

    /// Returns ids of artifacts no fingerprint mapping points at.
    async fn orphans(&self) -> Result<Vec<ArtifactId>>;

    /// Deletes an artifact and any mapping pointing at it.
    async fn delete(&self, id: &ArtifactId) -> Result<()>;
}

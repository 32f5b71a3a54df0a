//! In-process artifact store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ArtifactStore, Result, StoreError};
use crate::artifact::{ArtifactId, ArtifactKind, ConversionArtifact};
use crate::fingerprint::Fingerprint;

#[derive(Debug, Default)]
struct Tables {
    artifacts: HashMap<ArtifactId, ConversionArtifact>,
    fingerprints: HashMap<(ArtifactKind, Fingerprint), ArtifactId>,
}

/// Artifact store kept entirely in memory. Contents are lost on drop.
///
/// Both tables sit behind one lock, so `put` is all-or-nothing.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn put(&self, artifact: &ConversionArtifact) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables
            .artifacts
            .entry(artifact.id.clone())
            .and_modify(|stored| {
                stored.payload.clone_from(&artifact.payload);
                stored.proxy_count = artifact.proxy_count;
                stored.updated_at = artifact.updated_at;
            })
            .or_insert_with(|| artifact.clone());
        tables.fingerprints.insert(
            (artifact.kind, artifact.fingerprint.clone()),
            artifact.id.clone(),
        );
        Ok(())
    }

    async fn update_content(&self, artifact: &ConversionArtifact) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .artifacts
            .get_mut(&artifact.id)
            .ok_or_else(|| StoreError::ArtifactNotFound(artifact.id.to_string()))?;
        stored.payload.clone_from(&artifact.payload);
        stored.proxy_count = artifact.proxy_count;
        stored.updated_at = artifact.updated_at;
        Ok(())
    }

    async fn get(&self, id: &ArtifactId) -> Result<Option<ConversionArtifact>> {
        Ok(self.tables.lock().await.artifacts.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<ConversionArtifact>> {
        let tables = self.tables.lock().await;
        let mut artifacts: Vec<_> = tables.artifacts.values().cloned().collect();
        artifacts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(artifacts)
    }

    async fn lookup_fingerprint(
        &self,
        kind: ArtifactKind,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ArtifactId>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .fingerprints
            .get(&(kind, fingerprint.clone()))
            .cloned())
    }

    async fn orphans(&self) -> Result<Vec<ArtifactId>> {
        let tables = self.tables.lock().await;
        let mut orphans: Vec<&ConversionArtifact> = tables
            .artifacts
            .values()
            .filter(|a| !tables.fingerprints.values().any(|id| id == &a.id))
            .collect();
        orphans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(orphans.into_iter().map(|a| a.id.clone()).collect())
    }

    async fn delete(&self, id: &ArtifactId) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.artifacts.remove(id).is_none() {
            return Err(StoreError::ArtifactNotFound(id.to_string()));
        }
        tables.fingerprints.retain(|_, mapped| mapped != id);
        Ok(())
    }
}

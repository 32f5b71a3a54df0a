//! Artifact cache with stale-while-revalidate refresh.
//!
//! [`CacheService`] owns every artifact the process knows about. Reads are
//! served from memory (falling back to the durable store) and return
//! immediately; for URL-sourced artifacts each read also spawns a detached
//! refresh that re-fetches the source and replaces the payload in place.
//!
//! Locking: the artifact index is a `std::sync::RwLock` that is never held
//! across an `.await`. Fetching and conversion run with no lock held. A
//! refresh commits by writing the store first and swapping memory second,
//! with commits on one cache serialized so both sides see the same order.
//! Concurrent refreshes of one id are last-commit-wins: a slow refresh that
//! finishes after a fast one overwrites it, even with older content.

mod tracker;

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, instrument, warn};

use crate::artifact::{ArtifactId, ArtifactKind, ConversionArtifact};
use crate::fetch::{DEFAULT_FETCH_TIMEOUT, Fetcher, fetch_body};
use crate::fingerprint::Fingerprint;
use crate::pipeline::{self, ConvertError, PipelineOutput};
use crate::registry::FingerprintRegistry;
use crate::source::Source;
use crate::store::{ArtifactStore, StoreError};

use tracker::RefreshTracker;

/// Default number of refreshes allowed to run at once.
pub const DEFAULT_REFRESH_CONCURRENCY: usize = 4;

/// Pause before the single retry of a store write that hit a busy database.
const BUSY_RETRY_DELAY: Duration = Duration::from_millis(50);

type Index = HashMap<ArtifactId, Arc<ConversionArtifact>>;

/// Tuning for [`CacheService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Timeout applied to every source fetch.
    pub fetch_timeout: Duration,
    /// Maximum concurrent background refreshes.
    pub refresh_concurrency: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            refresh_concurrency: DEFAULT_REFRESH_CONCURRENCY,
        }
    }
}

struct Inner {
    index: RwLock<Index>,
    registry: FingerprintRegistry,
    store: Arc<dyn ArtifactStore>,
    fetcher: Arc<dyn Fetcher>,
    fetch_timeout: Duration,
    refresh_permits: Arc<Semaphore>,
    refreshes: Arc<RefreshTracker>,
    commits: Mutex<()>,
}

/// Owner of all conversion artifacts. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CacheService {
    inner: Arc<Inner>,
}

impl fmt::Debug for CacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("artifacts", &self.read_index().len())
            .field("fingerprints", &self.inner.registry.len())
            .field("refreshes_in_flight", &self.inner.refreshes.active())
            .finish_non_exhaustive()
    }
}

impl CacheService {
    /// Creates an empty cache over `store`, fetching URL sources with `fetcher`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        fetcher: Arc<dyn Fetcher>,
        options: CacheOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                index: RwLock::new(HashMap::new()),
                registry: FingerprintRegistry::new(),
                store,
                fetcher,
                fetch_timeout: options.fetch_timeout,
                refresh_permits: Arc::new(Semaphore::new(options.refresh_concurrency.max(1))),
                refreshes: Arc::new(RefreshTracker::default()),
                commits: Mutex::new(()),
            }),
        }
    }

    fn read_index(&self) -> RwLockReadGuard<'_, Index> {
        self.inner
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, Index> {
        self.inner
            .index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads every stored artifact into memory and registers the ones the
    /// durable fingerprint mapping points at. Returns the number loaded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn warm(&self) -> Result<usize, StoreError> {
        let artifacts = self.inner.store.list().await?;
        let count = artifacts.len();
        for artifact in artifacts {
            let registered = self.is_durably_registered(&artifact).await?;
            self.admit(artifact, registered);
        }
        debug!(count, "Cache warmed from store");
        Ok(count)
    }

    async fn is_durably_registered(&self, artifact: &ConversionArtifact) -> Result<bool, StoreError> {
        let mapped = self
            .inner
            .store
            .lookup_fingerprint(artifact.kind, &artifact.fingerprint)
            .await?;
        Ok(mapped.as_ref() == Some(&artifact.id))
    }

    /// Inserts a stored artifact unless memory already has a copy, and
    /// returns whichever copy is now in the index.
    fn admit(&self, artifact: ConversionArtifact, registered: bool) -> Arc<ConversionArtifact> {
        let mut index = self.write_index();
        let admitted = Arc::clone(
            index
                .entry(artifact.id.clone())
                .or_insert_with(|| Arc::new(artifact)),
        );
        if registered {
            self.inner.registry.register_if_absent(
                admitted.kind,
                admitted.fingerprint.clone(),
                admitted.id.clone(),
            );
        }
        admitted
    }

    /// Returns the artifact for `(kind, source)`, converting and storing it
    /// on first sight.
    ///
    /// An existing URL-sourced artifact is returned as-is and refreshed in
    /// the background.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError`] if the source cannot be fetched or converted,
    /// or the new artifact cannot be persisted.
    #[instrument(skip(self, source), fields(kind = %kind, source = %source))]
    pub async fn get_or_create(
        &self,
        kind: ArtifactKind,
        source: Source,
    ) -> Result<Arc<ConversionArtifact>, ConvertError> {
        let fingerprint = Fingerprint::of(&source);

        if let Some(existing) = self.find(kind, &fingerprint).await? {
            debug!(id = %existing.id, "Fingerprint already converted");
            self.refresh_in_background(&existing);
            return Ok(existing);
        }

        let output = self.produce(kind, &source).await?;
        let artifact = Arc::new(ConversionArtifact::new(
            kind,
            fingerprint,
            source,
            output.payload,
            output.count,
        ));

        if let Some(winner) = self.claim(&artifact) {
            debug!(id = %winner.id, discarded = %artifact.id, "Concurrent conversion registered first");
            return Ok(winner);
        }

        let store = self.inner.store.as_ref();
        if let Err(error) = retry_if_busy(|| store.put(&artifact)).await {
            self.release(&artifact);
            return Err(error.into());
        }

        info!(id = %artifact.id, proxies = artifact.proxy_count, "Artifact created");
        Ok(artifact)
    }

    async fn find(
        &self,
        kind: ArtifactKind,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Arc<ConversionArtifact>>, StoreError> {
        if let Some(id) = self.inner.registry.lookup(kind, fingerprint) {
            let cached = self.read_index().get(&id).cloned();
            if cached.is_some() {
                return Ok(cached);
            }
        }

        let Some(id) = self.inner.store.lookup_fingerprint(kind, fingerprint).await? else {
            return Ok(None);
        };
        let Some(stored) = self.inner.store.get(&id).await? else {
            return Ok(None);
        };
        Ok(Some(self.admit(stored, true)))
    }

    /// Registers the artifact's fingerprint and indexes it in one critical
    /// section. Returns the already registered artifact if another
    /// conversion got there first.
    fn claim(&self, artifact: &Arc<ConversionArtifact>) -> Option<Arc<ConversionArtifact>> {
        let mut index = self.write_index();
        let registry = &self.inner.registry;

        if let Some(existing_id) = registry.register_if_absent(
            artifact.kind,
            artifact.fingerprint.clone(),
            artifact.id.clone(),
        ) {
            if let Some(existing) = index.get(&existing_id) {
                return Some(Arc::clone(existing));
            }
            // Registered id with no artifact behind it: take the slot over.
            registry.register(
                artifact.kind,
                artifact.fingerprint.clone(),
                artifact.id.clone(),
            );
        }

        index.insert(artifact.id.clone(), Arc::clone(artifact));
        None
    }

    /// Undoes [`claim`](Self::claim) after a failed persist.
    fn release(&self, artifact: &ConversionArtifact) {
        let mut index = self.write_index();
        index.remove(&artifact.id);
        self.inner
            .registry
            .unregister_if(artifact.kind, &artifact.fingerprint, &artifact.id);
    }

    async fn produce(
        &self,
        kind: ArtifactKind,
        source: &Source,
    ) -> Result<PipelineOutput, ConvertError> {
        let content: Cow<'_, str> = match source {
            Source::Url(url) => Cow::Owned(
                fetch_body(self.inner.fetcher.as_ref(), url, self.inner.fetch_timeout).await?,
            ),
            Source::Text(text) => Cow::Borrowed(text),
        };

        let output = match kind {
            ArtifactKind::Feed => pipeline::convert_to_feed(&content)?,
            ArtifactKind::Document => pipeline::convert_to_structured(&content)?,
        };
        if output.passthrough {
            warn!(%source, "Source content was stored unchanged");
        }
        Ok(output)
    }

    /// Returns an artifact by id, loading it from the store if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store lookup fails.
    pub async fn artifact(
        &self,
        id: &ArtifactId,
    ) -> Result<Option<Arc<ConversionArtifact>>, StoreError> {
        let cached = self.read_index().get(id).cloned();
        if cached.is_some() {
            return Ok(cached);
        }

        let Some(stored) = self.inner.store.get(id).await? else {
            return Ok(None);
        };
        let registered = self.is_durably_registered(&stored).await?;
        Ok(Some(self.admit(stored, registered)))
    }

    /// Re-runs the artifact's conversion and replaces its content.
    ///
    /// Id, kind and fingerprint never change. On failure, including a failed
    /// store write, the previous content stays in place in memory and in the
    /// store. When two refreshes of one id overlap, whichever commits last
    /// wins.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::NotFound`] for an unknown id, or the fetch,
    /// conversion or storage error.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn refresh(&self, id: &ArtifactId) -> Result<Arc<ConversionArtifact>, ConvertError> {
        let snapshot = self
            .artifact(id)
            .await?
            .ok_or_else(|| ConvertError::NotFound(id.to_string()))?;

        let output = self.produce(snapshot.kind, &snapshot.source).await?;

        let _commit = self.inner.commits.lock().await;
        let current = self.read_index().get(id).cloned().unwrap_or(snapshot);
        let updated = Arc::new(current.with_content(output.payload, output.count));

        let store = self.inner.store.as_ref();
        retry_if_busy(|| store.update_content(&updated)).await?;
        self.write_index().insert(id.clone(), Arc::clone(&updated));

        debug!(proxies = updated.proxy_count, "Artifact refreshed");
        Ok(updated)
    }

    /// Returns the current payload of an artifact of `kind`, scheduling a
    /// background refresh first when the artifact is URL-sourced.
    ///
    /// The payload returned may be stale; the refresh never delays it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store lookup fails.
    #[instrument(skip(self), fields(id = %id, kind = %kind))]
    pub async fn serve(
        &self,
        kind: ArtifactKind,
        id: &ArtifactId,
    ) -> Result<Option<String>, StoreError> {
        let Some(artifact) = self.artifact(id).await? else {
            return Ok(None);
        };
        if artifact.kind != kind {
            debug!(actual = %artifact.kind, "Artifact exists with a different kind");
            return Ok(None);
        }
        self.refresh_in_background(&artifact);
        Ok(Some(artifact.payload.clone()))
    }

    /// Spawns a detached refresh for URL-sourced artifacts.
    fn refresh_in_background(&self, artifact: &ConversionArtifact) {
        if !artifact.auto_refresh {
            return;
        }

        let cache = self.clone();
        let id = artifact.id.clone();
        let ticket = self.inner.refreshes.start();

        tokio::spawn(async move {
            let _ticket = ticket;
            let Ok(_permit) = Arc::clone(&cache.inner.refresh_permits)
                .acquire_owned()
                .await
            else {
                return;
            };
            match cache.refresh(&id).await {
                Ok(updated) => debug!(id = %id, proxies = updated.proxy_count, "Background refresh done"),
                Err(error) => warn!(id = %id, %error, "Background refresh failed, keeping previous content"),
            }
        });
    }

    /// Number of background refreshes that have not finished.
    #[must_use]
    pub fn refreshes_in_flight(&self) -> usize {
        self.inner.refreshes.active()
    }

    /// Waits until every spawned refresh has finished.
    pub async fn wait_for_refreshes(&self) {
        self.inner.refreshes.wait_idle().await;
    }

    /// Returns every known artifact (memory and store), oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub async fn list(&self) -> Result<Vec<Arc<ConversionArtifact>>, StoreError> {
        self.warm().await?;
        let mut artifacts: Vec<_> = self.read_index().values().cloned().collect();
        artifacts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(artifacts)
    }

    /// Deletes stored artifacts that no durable fingerprint mapping points
    /// at, and drops them from memory. Returns the deleted ids.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read or written.
    #[instrument(skip(self))]
    pub async fn prune_orphans(&self) -> Result<Vec<ArtifactId>, StoreError> {
        let orphans = self.inner.store.orphans().await?;
        for id in &orphans {
            self.inner.store.delete(id).await?;
            let removed = self.write_index().remove(id);
            if let Some(artifact) = removed {
                self.inner
                    .registry
                    .unregister_if(artifact.kind, &artifact.fingerprint, id);
            }
        }
        if !orphans.is_empty() {
            info!(count = orphans.len(), "Pruned orphaned artifacts");
        }
        Ok(orphans)
    }
}

/// Runs a store write, retrying it once when the database reports it is
/// busy or locked.
async fn retry_if_busy<F, Fut>(mut write: F) -> Result<(), StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), StoreError>>,
{
    match write().await {
        Err(error) if error.is_busy_or_locked() => {
            warn!(%error, "Store busy, retrying write once");
            tokio::time::sleep(BUSY_RETRY_DELAY).await;
            write().await
        }
        result => result,
    }
}

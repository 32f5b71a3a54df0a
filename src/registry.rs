//! In-memory fingerprint → artifact id registry.
//!
//! Keys are `(ArtifactKind, Fingerprint)`: the same source converted to a
//! feed and to a document yields two distinct artifacts.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::artifact::{ArtifactId, ArtifactKind};
use crate::fingerprint::Fingerprint;

type Key = (ArtifactKind, Fingerprint);

/// Non-owning lookup from request fingerprint to the artifact produced for it.
#[derive(Debug, Default)]
pub struct FingerprintRegistry {
    entries: DashMap<Key, ArtifactId>,
}

impl FingerprintRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the artifact id registered for a fingerprint.
    #[must_use]
    pub fn lookup(&self, kind: ArtifactKind, fingerprint: &Fingerprint) -> Option<ArtifactId> {
        self.entries
            .get(&(kind, fingerprint.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Maps a fingerprint to an id, replacing any previous mapping.
    /// Returns the replaced id.
    pub fn register(
        &self,
        kind: ArtifactKind,
        fingerprint: Fingerprint,
        id: ArtifactId,
    ) -> Option<ArtifactId> {
        self.entries.insert((kind, fingerprint), id)
    }

    /// Maps a fingerprint to an id only if it is not mapped yet.
    ///
    /// Returns `None` when `id` was registered, or the already registered id.
    pub fn register_if_absent(
        &self,
        kind: ArtifactKind,
        fingerprint: Fingerprint,
        id: ArtifactId,
    ) -> Option<ArtifactId> {
        match self.entries.entry((kind, fingerprint)) {
            Entry::Occupied(existing) => Some(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(id);
                None
            }
        }
    }

    /// Removes a mapping only if it still points at `id`.
    pub fn unregister_if(
        &self,
        kind: ArtifactKind,
        fingerprint: &Fingerprint,
        id: &ArtifactId,
    ) -> bool {
        self.entries
            .remove_if(&(kind, fingerprint.clone()), |_, current| current == id)
            .is_some()
    }

    /// Number of registered fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::from_hex(s)
    }

    fn id(s: &str) -> ArtifactId {
        ArtifactId::from(s.to_string())
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = FingerprintRegistry::new();
        assert!(registry.lookup(ArtifactKind::Feed, &fp("a")).is_none());
        registry.register(ArtifactKind::Feed, fp("a"), id("1"));
        assert_eq!(registry.lookup(ArtifactKind::Feed, &fp("a")), Some(id("1")));
    }

    #[test]
    fn test_kinds_are_separate_keys() {
        let registry = FingerprintRegistry::new();
        registry.register(ArtifactKind::Feed, fp("a"), id("1"));
        assert!(registry.lookup(ArtifactKind::Document, &fp("a")).is_none());
    }

    #[test]
    fn test_register_overwrites() {
        let registry = FingerprintRegistry::new();
        registry.register(ArtifactKind::Feed, fp("a"), id("1"));
        let previous = registry.register(ArtifactKind::Feed, fp("a"), id("2"));
        assert_eq!(previous, Some(id("1")));
        assert_eq!(registry.lookup(ArtifactKind::Feed, &fp("a")), Some(id("2")));
    }

    #[test]
    fn test_register_if_absent_keeps_first() {
        let registry = FingerprintRegistry::new();
        assert!(registry.register_if_absent(ArtifactKind::Feed, fp("a"), id("1")).is_none());
        assert_eq!(
            registry.register_if_absent(ArtifactKind::Feed, fp("a"), id("2")),
            Some(id("1"))
        );
        assert_eq!(registry.lookup(ArtifactKind::Feed, &fp("a")), Some(id("1")));
    }

    #[test]
    fn test_unregister_if_only_removes_matching_id() {
        let registry = FingerprintRegistry::new();
        registry.register(ArtifactKind::Feed, fp("a"), id("1"));
        assert!(!registry.unregister_if(ArtifactKind::Feed, &fp("a"), &id("2")));
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister_if(ArtifactKind::Feed, &fp("a"), &id("1")));
        assert!(registry.is_empty());
    }
}

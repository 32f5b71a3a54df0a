//! Conversion artifacts: the stored, servable result of one conversion.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::source::Source;

/// What an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Base64 feed produced from a document.
    Feed,
    /// Structured document synthesized from a feed.
    Document,
}

impl ArtifactKind {
    /// Returns the storage tag (`feed` or `document`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feed" => Ok(Self::Feed),
            "document" => Ok(Self::Document),
            other => Err(format!("unknown artifact kind '{other}'")),
        }
    }
}

/// Opaque artifact identifier: 16 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Generates a new id from 8 random bytes.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Returns the id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ArtifactId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ArtifactId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The result of one conversion plus its metadata.
///
/// Identity (`id`, `kind`, `fingerprint`, `source`, `created_at`) is fixed at
/// creation. Refresh replaces `payload`, `proxy_count` and `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionArtifact {
    pub id: ArtifactId,
    pub kind: ArtifactKind,
    pub fingerprint: Fingerprint,
    pub source: Source,
    pub payload: String,
    pub proxy_count: usize,
    /// True iff the source is a URL.
    pub auto_refresh: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversionArtifact {
    /// Creates a new artifact with a fresh id.
    #[must_use]
    pub fn new(
        kind: ArtifactKind,
        fingerprint: Fingerprint,
        source: Source,
        payload: String,
        proxy_count: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ArtifactId::generate(),
            kind,
            fingerprint,
            auto_refresh: source.is_remote(),
            source,
            payload,
            proxy_count,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy with new content and a bumped update time.
    #[must_use]
    pub fn with_content(&self, payload: String, proxy_count: usize) -> Self {
        Self {
            payload,
            proxy_count,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}

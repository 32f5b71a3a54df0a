//! Structured-document codec (Clash-style YAML).
//!
//! Parsing only looks at the `proxies` list; every other top-level key is
//! ignored. Serialization produces either a minimal document (records only)
//! or a synthesized one with the fixed scaffold from [`scaffold`].

mod error;
pub mod scaffold;

pub use error::DocumentError;
pub use scaffold::{DnsSettings, ProxyGroup, SynthesizedDocument};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::proxy::ProxyRecord;

/// A document holding proxy records, with optional groups and rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StructuredDocument {
    /// Proxy records in document order.
    pub proxies: Vec<ProxyRecord>,
    /// Proxy groups; empty for minimal documents.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proxy_groups: Vec<ProxyGroup>,
    /// Routing rules; empty for minimal documents.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
}

impl StructuredDocument {
    /// Creates a minimal document with no groups or rules.
    #[must_use]
    pub fn from_records(proxies: Vec<ProxyRecord>) -> Self {
        Self {
            proxies,
            ..Self::default()
        }
    }

    /// Parses a document. Proxies without a name are named `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Parse`] for malformed YAML or a non-mapping
    /// top level.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let mut doc: Self =
            serde_yaml::from_str(text).map_err(|source| DocumentError::Parse { source })?;
        doc.proxies = doc
            .proxies
            .into_iter()
            .map(ProxyRecord::with_default_name)
            .collect();
        Ok(doc)
    }

    /// Writes the document as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Serialize`] if YAML emission fails.
    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        serde_yaml::to_string(self).map_err(|source| DocumentError::Serialize { source })
    }

    /// Finds a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&ProxyGroup> {
        self.proxy_groups.iter().find(|g| g.name == name)
    }
}

/// Parses a document and returns its proxy records.
///
/// # Errors
///
/// Returns [`DocumentError::Parse`] when the text is not a valid document.
#[instrument(level = "debug", skip(text), fields(len = text.len()))]
pub fn parse_document(text: &str) -> Result<Vec<ProxyRecord>, DocumentError> {
    StructuredDocument::parse(text).map(|doc| doc.proxies)
}

/// Serializes records as a minimal document.
///
/// # Errors
///
/// Returns [`DocumentError::Serialize`] if YAML emission fails.
pub fn serialize_document(records: &[ProxyRecord]) -> Result<String, DocumentError> {
    StructuredDocument::from_records(records.to_vec()).to_yaml()
}

/// Serializes records inside the full routing scaffold.
///
/// # Errors
///
/// Returns [`DocumentError::Serialize`] if YAML emission fails.
pub fn serialize_full_document(records: &[ProxyRecord]) -> Result<String, DocumentError> {
    SynthesizedDocument::from_records(records.to_vec()).to_yaml()
}

//! Content classification: structured document, feed, or unknown.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::codec::SCHEMES;

const DOCUMENT_MARKERS: [&str; 3] = ["proxies:", "proxy-groups:", "rules:"];

/// The detected kind of an input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// A structured (YAML) document.
    Structured,
    /// A feed, either plaintext URI lines or base64 of them.
    Feed,
    /// Neither heuristic matched.
    Unknown,
}

impl ContentKind {
    /// Returns a lowercase label for logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Feed => "feed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies input text. The first matching rule wins:
///
/// 1. a document marker (`proxies:`, `proxy-groups:`, `rules:`) → structured
/// 2. a supported scheme prefix → feed
/// 3. strict base64 (ignoring line breaks and spaces) containing `://` → feed
/// 4. otherwise unknown
///
/// The marker check is a plain substring test, so a feed whose text happens
/// to contain `rules:` is classified as structured.
#[must_use]
pub fn classify(content: &str) -> ContentKind {
    let content = content.trim();

    if DOCUMENT_MARKERS.iter().any(|m| content.contains(m)) {
        return ContentKind::Structured;
    }
    if SCHEMES.iter().any(|s| content.contains(s)) {
        return ContentKind::Feed;
    }
    if is_base64_feed(content) {
        return ContentKind::Feed;
    }
    ContentKind::Unknown
}

fn is_base64_feed(content: &str) -> bool {
    let cleaned: String = content
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | ' '))
        .collect();
    if cleaned.is_empty() {
        return false;
    }
    STANDARD
        .decode(cleaned.as_bytes())
        .is_ok_and(|decoded| decoded.windows(3).any(|w| w == b"://"))
}

//! Where a conversion's input comes from.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::pipeline::ConvertError;

/// Conversion input: a remote URL to fetch, or inline text.
///
/// URL-sourced artifacts are refreshed in the background whenever they are
/// read; text-sourced artifacts never change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Source {
    /// Remote URL, fetched on creation and on every refresh.
    Url(String),
    /// Inline text supplied with the request.
    Text(String),
}

impl Source {
    /// Builds a source from request parts: a kind tag (`url` or `text`) plus
    /// the matching value.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidRequest`] for an unknown kind, an empty
    /// value, or a URL that does not parse as `http`/`https`.
    pub fn from_parts(kind: &str, url: &str, text: &str) -> Result<Self, ConvertError> {
        let source = match kind {
            "url" => Self::Url(url.trim().to_string()),
            "text" => Self::Text(text.to_string()),
            other => {
                return Err(ConvertError::InvalidRequest(format!(
                    "unknown source kind '{other}' (expected 'url' or 'text')"
                )));
            }
        };
        source.validate()?;
        Ok(source)
    }

    /// Checks that the source is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidRequest`] for an empty URL or text, or
    /// a URL without an `http`/`https` scheme.
    pub fn validate(&self) -> Result<(), ConvertError> {
        match self {
            Self::Url(url) => {
                if url.trim().is_empty() {
                    return Err(ConvertError::InvalidRequest("URL is empty".to_string()));
                }
                let parsed = Url::parse(url).map_err(|e| {
                    ConvertError::InvalidRequest(format!("invalid URL '{url}': {e}"))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConvertError::InvalidRequest(format!(
                        "unsupported URL scheme '{}' (expected http or https)",
                        parsed.scheme()
                    )));
                }
                Ok(())
            }
            Self::Text(text) => {
                if text.trim().is_empty() {
                    return Err(ConvertError::InvalidRequest("text is empty".to_string()));
                }
                Ok(())
            }
        }
    }

    /// True for URL sources.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    /// Returns `url` or `text`.
    #[must_use]
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Text(_) => "text",
        }
    }

    /// Returns the URL or text value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Url(value) | Self::Text(value) => value,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "url:{url}"),
            Self::Text(text) => write!(f, "text:{} bytes", text.len()),
        }
    }
}

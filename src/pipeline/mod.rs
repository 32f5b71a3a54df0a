//! Conversion pipelines between structured documents and feeds.
//!
//! - Document → feed: parse, encode each supported record, join, base64.
//! - Feed → document: lenient base64 decode, decode each line, then either a
//!   minimal document or one wrapped in the fixed routing scaffold.
//!
//! [`convert_to_feed`] and [`convert_to_structured`] accept input of any
//! kind and route it through the classifier first.

mod error;

pub use error::ConvertError;

use tracing::{debug, instrument, warn};

use crate::classify::{ContentKind, classify};
use crate::codec::{self, DecodedLines, decode_blob, encode_base64};
use crate::document::{self, parse_document};
use crate::proxy::ProxyRecord;

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    /// The produced feed or document text.
    pub payload: String,
    /// Number of proxy records in the payload.
    pub count: usize,
    /// True when the input could not be classified and was returned as-is.
    pub passthrough: bool,
}

impl PipelineOutput {
    fn converted(payload: String, count: usize) -> Self {
        Self {
            payload,
            count,
            passthrough: false,
        }
    }

    fn passthrough(content: &str, count: usize) -> Self {
        Self {
            payload: content.to_string(),
            count,
            passthrough: true,
        }
    }
}

/// Encodes records into a base64 feed, skipping unsupported protocols.
///
/// # Errors
///
/// Returns [`ConvertError::NoValidEntries`] when no record could be encoded.
pub fn encode_feed(records: &[ProxyRecord]) -> Result<PipelineOutput, ConvertError> {
    let (supported, unsupported): (Vec<&ProxyRecord>, Vec<&ProxyRecord>) = records
        .iter()
        .partition(|record| record.protocol.is_supported());
    for record in unsupported {
        debug!(
            name = %record.name,
            protocol = %record.protocol,
            "Skipping proxy with unsupported protocol"
        );
    }

    let lines: Vec<String> = supported.into_iter().filter_map(codec::encode_uri).collect();
    if lines.is_empty() {
        return Err(ConvertError::NoValidEntries);
    }
    Ok(PipelineOutput::converted(
        encode_base64(&lines.join("\n")),
        lines.len(),
    ))
}

/// Converts a structured document to a feed.
///
/// # Errors
///
/// Returns [`ConvertError::Document`] when the document does not parse, or
/// [`ConvertError::NoValidEntries`] when it holds no supported proxies.
#[instrument(level = "debug", skip(document), fields(len = document.len()))]
pub fn document_to_feed(document: &str) -> Result<PipelineOutput, ConvertError> {
    let records = parse_document(document)?;
    encode_feed(&records)
}

/// Decodes a feed into records.
///
/// The input may be base64 or plaintext; anything that does not decode to
/// UTF-8 base64 is read as plaintext.
#[must_use]
pub fn decode_feed(content: &str) -> DecodedLines {
    let plaintext = decode_blob(content);
    codec::decode_lines(plaintext.as_deref().unwrap_or(content))
}

fn feed_records(content: &str) -> Result<Vec<ProxyRecord>, ConvertError> {
    let decoded = decode_feed(content);
    if !decoded.skipped.is_empty() {
        warn!(
            skipped = decoded.skipped.len(),
            decoded = decoded.records.len(),
            "Some feed lines could not be decoded"
        );
    }
    if decoded.records.is_empty() {
        return Err(ConvertError::NoValidEntries);
    }
    Ok(decoded.records)
}

/// Converts a feed to a minimal document (records only).
///
/// # Errors
///
/// Returns [`ConvertError::NoValidEntries`] when no line decodes.
#[instrument(level = "debug", skip(content), fields(len = content.len()))]
pub fn feed_to_document(content: &str) -> Result<PipelineOutput, ConvertError> {
    let records = feed_records(content)?;
    let payload = document::serialize_document(&records)?;
    Ok(PipelineOutput::converted(payload, records.len()))
}

/// Converts a feed to a complete document with the routing scaffold.
///
/// # Errors
///
/// Returns [`ConvertError::NoValidEntries`] when no line decodes.
#[instrument(level = "debug", skip(content), fields(len = content.len()))]
pub fn feed_to_full_document(content: &str) -> Result<PipelineOutput, ConvertError> {
    let records = feed_records(content)?;
    let payload = document::serialize_full_document(&records)?;
    Ok(PipelineOutput::converted(payload, records.len()))
}

/// Converts input of any kind to a feed.
///
/// Structured input is parsed directly; if it fails to parse it is retried
/// as a feed. Feed input is decoded. Unknown input is tried as a feed and
/// then as a document.
///
/// # Errors
///
/// Returns [`ConvertError::FormatAmbiguous`] when neither reading works, or
/// [`ConvertError::NoValidEntries`] when the input holds no supported proxies.
#[instrument(level = "debug", skip(content), fields(len = content.len()))]
pub fn convert_to_feed(content: &str) -> Result<PipelineOutput, ConvertError> {
    let kind = classify(content);
    debug!(%kind, "Classified input");

    let records = match kind {
        ContentKind::Structured => match parse_document(content) {
            Ok(records) => records,
            Err(doc_err) => feed_records(content).map_err(|feed_err| {
                ConvertError::FormatAmbiguous {
                    document: doc_err.to_string(),
                    feed: feed_err.to_string(),
                }
            })?,
        },
        ContentKind::Feed => feed_records(content)?,
        ContentKind::Unknown => match feed_records(content) {
            Ok(records) => records,
            Err(feed_err) => {
                warn!("Input is neither a recognizable document nor a feed, trying it as a document");
                parse_document(content).map_err(|doc_err| ConvertError::FormatAmbiguous {
                    document: doc_err.to_string(),
                    feed: feed_err.to_string(),
                })?
            }
        },
    };

    encode_feed(&records)
}

/// Converts input of any kind to a complete document.
///
/// Structured input is passed through unchanged with its record count (0 if
/// it does not parse). Feed input is synthesized into a full document.
/// Unknown input is tried as a feed and passed through unchanged if that
/// yields nothing.
///
/// # Errors
///
/// Returns [`ConvertError::NoValidEntries`] for a feed with no decodable
/// lines.
#[instrument(level = "debug", skip(content), fields(len = content.len()))]
pub fn convert_to_structured(content: &str) -> Result<PipelineOutput, ConvertError> {
    let kind = classify(content);
    debug!(%kind, "Classified input");

    match kind {
        ContentKind::Structured => {
            let count = parse_document(content).map_or(0, |records| records.len());
            Ok(PipelineOutput::converted(content.to_string(), count))
        }
        ContentKind::Feed => feed_to_full_document(content),
        ContentKind::Unknown => match feed_to_full_document(content) {
            Err(ConvertError::NoValidEntries) => {
                warn!("Input could not be classified, returning it unchanged");
                Ok(PipelineOutput::passthrough(content, 0))
            }
            other => other,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::decode_padded_text;
    use crate::document::StructuredDocument;

    const DOC: &str = "proxies:\n  - {name: a, type: ss, server: a.example.com, port: 1, cipher: aes-256-gcm, password: p}\n  - {name: b, type: vless, server: b.example.com, port: 2}\n";

    #[test]
    fn test_document_to_feed_skips_unsupported() {
        let out = document_to_feed(DOC).unwrap();
        assert_eq!(out.count, 1);
        let plain = decode_padded_text(&out.payload).unwrap();
        assert_eq!(plain.lines().count(), 1);
        assert!(plain.starts_with("ss://"));
    }

    #[test]
    fn test_document_to_feed_with_only_unsupported_fails() {
        let doc = "proxies:\n  - {name: b, type: vless, server: b.example.com, port: 2}\n";
        assert!(matches!(
            document_to_feed(doc),
            Err(ConvertError::NoValidEntries)
        ));
    }

    #[test]
    fn test_decode_feed_reads_plaintext_when_not_base64() {
        let decoded = decode_feed("trojan://p@h.example.com:1#x\n");
        assert_eq!(decoded.records.len(), 1);
    }

    #[test]
    fn test_feed_to_document_is_minimal() {
        let feed = encode_base64("trojan://p@h.example.com:1#x\ntrojan://p@h.example.com:2#y");
        let out = feed_to_document(&feed).unwrap();
        assert_eq!(out.count, 2);
        let doc = StructuredDocument::parse(&out.payload).unwrap();
        assert!(doc.proxy_groups.is_empty());
        assert!(doc.rules.is_empty());
    }

    #[test]
    fn test_feed_with_no_valid_lines_fails() {
        assert!(matches!(
            feed_to_document("trojan://missing-port"),
            Err(ConvertError::NoValidEntries)
        ));
    }

    #[test]
    fn test_convert_to_feed_falls_back_to_feed_when_document_is_broken() {
        // Contains a marker but is not YAML; the lines still decode as a feed.
        let content = "rules: [\ntrojan://p@h.example.com:1#x\n";
        let out = convert_to_feed(content).unwrap();
        assert_eq!(out.count, 1);
    }

    #[test]
    fn test_convert_to_feed_reports_both_reasons() {
        let err = convert_to_feed("proxies: [").unwrap_err();
        assert!(matches!(err, ConvertError::FormatAmbiguous { .. }));
    }

    #[test]
    fn test_convert_to_feed_accepts_feed_input() {
        let out = convert_to_feed("trojan://p@h.example.com:1#x").unwrap();
        assert_eq!(
            decode_padded_text(&out.payload).unwrap(),
            "trojan://p@h.example.com:1#x"
        );
    }

    #[test]
    fn test_convert_to_structured_passes_documents_through() {
        let out = convert_to_structured(DOC).unwrap();
        assert_eq!(out.payload, DOC);
        assert_eq!(out.count, 2);
        assert!(!out.passthrough);
    }

    #[test]
    fn test_convert_to_structured_passes_unknown_through() {
        let out = convert_to_structured("hello there").unwrap();
        assert_eq!(out.payload, "hello there");
        assert!(out.passthrough);
        assert_eq!(out.count, 0);
    }

    #[test]
    fn test_convert_to_structured_feed_without_valid_lines_fails() {
        assert!(matches!(
            convert_to_structured("trojan://missing-port"),
            Err(ConvertError::NoValidEntries)
        ));
    }
}

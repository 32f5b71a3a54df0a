//! Per-protocol proxy URI codecs.
//!
//! Each supported protocol has a module with `encode`/`decode` and its
//! scheme prefix. [`decode_uri`] dispatches on the prefix; [`decode_lines`]
//! decodes a whole plaintext feed, skipping lines that fail.

mod encoding;
mod error;
pub mod shadowsocks;
pub mod trojan;
pub mod vmess;

pub use encoding::{
    decode_blob, decode_name, decode_padded, decode_padded_text, encode_base64, encode_name,
};
pub use error::DecodeError;

use tracing::debug;

use crate::proxy::{Protocol, ProxyRecord};

/// Scheme prefixes of every supported protocol.
pub const SCHEMES: [&str; 3] = [shadowsocks::SCHEME, vmess::SCHEME, trojan::SCHEME];

/// Encodes a record as a URI line, or `None` for unsupported protocols.
#[must_use]
pub fn encode_uri(record: &ProxyRecord) -> Option<String> {
    match record.protocol {
        Protocol::Shadowsocks => Some(shadowsocks::encode(record)),
        Protocol::Vmess => Some(vmess::encode(record)),
        Protocol::Trojan => Some(trojan::encode(record)),
        Protocol::Other(_) => None,
    }
}

/// Decodes one URI line by dispatching on its scheme.
///
/// # Errors
///
/// Returns [`DecodeError::UnsupportedScheme`] for unknown schemes, or the
/// protocol codec's error.
pub fn decode_uri(line: &str) -> Result<ProxyRecord, DecodeError> {
    let line = line.trim();
    if line.starts_with(shadowsocks::SCHEME) {
        shadowsocks::decode(line)
    } else if line.starts_with(vmess::SCHEME) {
        vmess::decode(line)
    } else if line.starts_with(trojan::SCHEME) {
        trojan::decode(line)
    } else {
        Err(DecodeError::unsupported_scheme(line))
    }
}

/// A feed line that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the plaintext feed.
    pub line_number: usize,
    /// Why the line was skipped.
    pub error: DecodeError,
}

/// Records decoded from a plaintext feed plus the lines that were skipped.
#[derive(Debug, Clone, Default)]
pub struct DecodedLines {
    /// Successfully decoded records, in feed order.
    pub records: Vec<ProxyRecord>,
    /// Lines that failed to decode.
    pub skipped: Vec<SkippedLine>,
}

/// Decodes every non-empty line of a plaintext feed.
///
/// Lines without a supported scheme are skipped silently; lines with a
/// supported scheme that fail to decode are recorded in
/// [`DecodedLines::skipped`].
#[must_use]
pub fn decode_lines(plaintext: &str) -> DecodedLines {
    let mut decoded = DecodedLines::default();
    for (index, line) in plaintext.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match decode_uri(line) {
            Ok(record) => decoded.records.push(record),
            Err(DecodeError::UnsupportedScheme { .. }) => {}
            Err(error) => {
                debug!(line_number = index + 1, %error, "Skipping undecodable feed line");
                decoded.skipped.push(SkippedLine {
                    line_number: index + 1,
                    error,
                });
            }
        }
    }
    decoded
}

/// Splits `body#fragment`, percent-decoding the fragment into a name.
/// Missing fragments yield an empty name.
pub(crate) fn split_fragment(body: &str) -> (&str, String) {
    match body.split_once('#') {
        Some((body, fragment)) => (body, decode_name(fragment)),
        None => (body, String::new()),
    }
}

/// Parses `host:port`, dropping any `?query` or `/path` after the port.
///
/// The split is on the last `:`, so bracketless IPv6 literals resolve to the
/// final segment as port.
pub(crate) fn split_endpoint(
    protocol: &'static str,
    endpoint: &str,
) -> Result<(String, u16), DecodeError> {
    let end = endpoint
        .find(|c: char| c == '?' || c == '/')
        .unwrap_or(endpoint.len());
    let endpoint = &endpoint[..end];

    let (host, port) = endpoint.rsplit_once(':').ok_or(DecodeError::Malformed {
        protocol,
        reason: "missing ':' between server and port",
    })?;
    let port = port.parse::<u16>().map_err(|_| DecodeError::InvalidPort {
        protocol,
        value: port.to_string(),
    })?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_uri_dispatches_on_scheme() {
        let record = decode_uri("  trojan://pw@h.example.com:443#t  ").unwrap();
        assert_eq!(record.protocol, Protocol::Trojan);
    }

    #[test]
    fn test_decode_uri_rejects_unknown_scheme() {
        let err = decode_uri("vless://abc@h:443").unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedScheme { .. }));
    }

    #[test]
    fn test_encode_uri_skips_unsupported_protocol() {
        let record = ProxyRecord {
            protocol: Protocol::Other("vless".to_string()),
            ..ProxyRecord::default()
        };
        assert!(encode_uri(&record).is_none());
    }

    #[test]
    fn test_decode_lines_skips_unknown_and_records_failures() {
        let feed = "ss://YWVzLTI1Ni1nY206cGFzcw@a.example.com:1#a\n\
                    \n\
                    vless://ignored\n\
                    trojan://pw@b.example.com:bad#b\n\
                    trojan://pw@c.example.com:3#c\n";
        let decoded = decode_lines(feed);
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].name, "a");
        assert_eq!(decoded.records[1].name, "c");
        assert_eq!(decoded.skipped.len(), 1);
        assert_eq!(decoded.skipped[0].line_number, 4);
    }

    #[test]
    fn test_split_endpoint_uses_last_colon() {
        let (host, port) = split_endpoint("ss", "2001:db8::1:8388").unwrap();
        assert_eq!(host, "2001:db8::1");
        assert_eq!(port, 8388);
    }

    #[test]
    fn test_split_fragment_without_name() {
        let (body, name) = split_fragment("pw@h:1");
        assert_eq!(body, "pw@h:1");
        assert!(name.is_empty());
    }
}

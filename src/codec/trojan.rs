//! Trojan `trojan://password@host:port#name` links.

use super::encoding::encode_name;
use super::{DecodeError, split_endpoint, split_fragment};
use crate::proxy::ProxyRecord;

/// URI scheme prefix.
pub const SCHEME: &str = "trojan://";

const PROTOCOL: &str = "trojan";

/// Encodes a trojan record as a `trojan://` URI.
///
/// The password is written unescaped. Decoding splits on the last `@`, so
/// `@` and `:` inside a password survive, but a `#` starts the fragment and
/// the line no longer decodes.
#[must_use]
pub fn encode(record: &ProxyRecord) -> String {
    format!(
        "{SCHEME}{}@{}:{}#{}",
        record.password,
        record.server,
        record.port,
        encode_name(&record.name)
    )
}

/// Decodes a `trojan://` URI. Query parameters after the port are ignored.
///
/// # Errors
///
/// Returns [`DecodeError`] when the `@` separator or the port is missing or
/// invalid.
pub fn decode(uri: &str) -> Result<ProxyRecord, DecodeError> {
    let body = uri.strip_prefix(SCHEME).unwrap_or(uri);
    let (body, name) = split_fragment(body);
    let (password, endpoint) = body.rsplit_once('@').ok_or(DecodeError::Malformed {
        protocol: PROTOCOL,
        reason: "missing '@' between password and server",
    })?;
    let (server, port) = split_endpoint(PROTOCOL, endpoint)?;

    Ok(ProxyRecord::trojan(name, server, port, password))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::proxy::Protocol;

    #[test]
    fn test_decode_plain_link() {
        let record = decode("trojan://secret@t.example.com:443#Trojan%20JP").unwrap();
        assert_eq!(record.protocol, Protocol::Trojan);
        assert_eq!(record.password, "secret");
        assert_eq!(record.server, "t.example.com");
        assert_eq!(record.port, 443);
        assert_eq!(record.name, "Trojan JP");
    }

    #[test]
    fn test_decode_ignores_query() {
        let record = decode("trojan://secret@t.example.com:443?sni=t.example.com#n").unwrap();
        assert_eq!(record.port, 443);
        assert_eq!(record.server, "t.example.com");
    }

    #[test]
    fn test_decode_without_name_uses_endpoint() {
        let record = decode("trojan://secret@t.example.com:443").unwrap();
        assert_eq!(record.name, "t.example.com:443");
    }

    #[test]
    fn test_decode_missing_port_fails() {
        let err = decode("trojan://secret@t.example.com").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_encode_escapes_name() {
        let record = ProxyRecord::trojan("a b", "t.example.com", 443, "secret");
        assert_eq!(encode(&record), "trojan://secret@t.example.com:443#a%20b");
    }

    #[test]
    fn test_password_with_at_and_colon_round_trips() {
        let record = ProxyRecord::trojan("n", "t.example.com", 443, "p@ss:w@rd");
        assert_eq!(decode(&encode(&record)).unwrap(), record);
    }

    #[test]
    fn test_password_with_hash_is_written_raw_and_does_not_decode() {
        let record = ProxyRecord::trojan("n", "t.example.com", 443, "a#b");
        let line = encode(&record);
        assert_eq!(line, "trojan://a#b@t.example.com:443#n");
        assert!(matches!(decode(&line), Err(DecodeError::Malformed { .. })));
    }
}

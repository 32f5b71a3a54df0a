//! Shadowsocks `ss://` links.
//!
//! Encoded form: `ss://base64(cipher:password)@host:port#name`. Decoding also
//! accepts plain `cipher:password` userinfo, a fully base64-encoded body
//! (`ss://base64(cipher:password@host:port)#name`), and a trailing plugin
//! query after the port.

use std::borrow::Cow;

use super::encoding::{decode_padded_text, encode_base64, encode_name};
use super::{DecodeError, split_endpoint, split_fragment};
use crate::proxy::ProxyRecord;

/// URI scheme prefix.
pub const SCHEME: &str = "ss://";

const PROTOCOL: &str = "ss";

/// Encodes a shadowsocks record as an `ss://` URI.
#[must_use]
pub fn encode(record: &ProxyRecord) -> String {
    let userinfo = encode_base64(&format!("{}:{}", record.cipher, record.password));
    format!(
        "{SCHEME}{userinfo}@{}:{}#{}",
        record.server,
        record.port,
        encode_name(&record.name)
    )
}

/// Decodes an `ss://` URI.
///
/// # Errors
///
/// Returns [`DecodeError`] when the body is missing its `@`, the credentials
/// are neither `cipher:password` nor base64 of it, or the port is invalid.
pub fn decode(uri: &str) -> Result<ProxyRecord, DecodeError> {
    let body = uri.strip_prefix(SCHEME).unwrap_or(uri);
    let (body, name) = split_fragment(body);

    let body: Cow<'_, str> = if body.contains('@') {
        Cow::Borrowed(body)
    } else {
        Cow::Owned(
            decode_padded_text(body).ok_or(DecodeError::InvalidBase64 { protocol: PROTOCOL })?,
        )
    };

    let (auth, endpoint) = body.rsplit_once('@').ok_or(DecodeError::Malformed {
        protocol: PROTOCOL,
        reason: "missing '@' between credentials and server",
    })?;
    let (cipher, password) = split_credentials(auth)?;
    let (server, port) = split_endpoint(PROTOCOL, endpoint)?;

    Ok(ProxyRecord::shadowsocks(
        name, server, port, cipher, password,
    ))
}

fn split_credentials(auth: &str) -> Result<(String, String), DecodeError> {
    if let Some((cipher, password)) = auth.split_once(':') {
        return Ok((cipher.to_string(), password.to_string()));
    }

    let decoded =
        decode_padded_text(auth).ok_or(DecodeError::InvalidBase64 { protocol: PROTOCOL })?;
    decoded
        .split_once(':')
        .map(|(cipher, password)| (cipher.to_string(), password.to_string()))
        .ok_or(DecodeError::Malformed {
            protocol: PROTOCOL,
            reason: "credentials are not in cipher:password form",
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::proxy::Protocol;

    #[test]
    fn test_decode_base64_userinfo() {
        let record = decode("ss://YWVzLTI1Ni1nY206cGFzcw==@example.com:8443#My%20Node").unwrap();
        assert_eq!(record.protocol, Protocol::Shadowsocks);
        assert_eq!(record.cipher, "aes-256-gcm");
        assert_eq!(record.password, "pass");
        assert_eq!(record.server, "example.com");
        assert_eq!(record.port, 8443);
        assert_eq!(record.name, "My Node");
    }

    #[test]
    fn test_decode_unpadded_userinfo() {
        let record = decode("ss://YWVzLTI1Ni1nY206cGFzcw@example.com:8443").unwrap();
        assert_eq!(record.password, "pass");
        assert_eq!(record.name, "example.com:8443");
    }

    #[test]
    fn test_decode_plain_userinfo() {
        let record = decode("ss://chacha20-ietf-poly1305:p@ss@1.2.3.4:443#n").unwrap();
        assert_eq!(record.cipher, "chacha20-ietf-poly1305");
        assert_eq!(record.password, "p@ss");
        assert_eq!(record.server, "1.2.3.4");
    }

    #[test]
    fn test_decode_fully_encoded_body() {
        let body = encode_base64("aes-128-gcm:secret@hk.example.com:8388");
        let record = decode(&format!("ss://{body}#HK")).unwrap();
        assert_eq!(record.cipher, "aes-128-gcm");
        assert_eq!(record.password, "secret");
        assert_eq!(record.server, "hk.example.com");
        assert_eq!(record.port, 8388);
        assert_eq!(record.name, "HK");
    }

    #[test]
    fn test_decode_strips_plugin_query() {
        let record =
            decode("ss://YWVzLTI1Ni1nY206cGFzcw@example.com:8443/?plugin=obfs-local#Q").unwrap();
        assert_eq!(record.port, 8443);
        assert_eq!(record.name, "Q");
    }

    #[test]
    fn test_decode_missing_at_fails() {
        let err = decode("ss://bm90LWEtdmFsaWQtYm9keQ==").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_decode_bad_port_fails() {
        let err = decode("ss://YWVzLTI1Ni1nY206cGFzcw@example.com:port").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPort { .. }));
    }

    #[test]
    fn test_encode_uses_standard_base64_and_escaped_name() {
        let record = ProxyRecord::shadowsocks("My Node", "example.com", 8443, "aes-256-gcm", "pass");
        assert_eq!(
            encode(&record),
            "ss://YWVzLTI1Ni1nY206cGFzcw==@example.com:8443#My%20Node"
        );
    }
}

//! VMess `vmess://base64(json)` links.
//!
//! Feeds in the wild disagree on field types: `port` and `aid` show up as
//! JSON numbers, floats and strings. Decoding reads every field through a
//! lenient accessor instead of a strict struct.

use serde_json::{Map, Value, json};

use super::DecodeError;
use super::encoding::{decode_padded, encode_base64};
use crate::proxy::{Protocol, ProxyRecord};

/// URI scheme prefix.
pub const SCHEME: &str = "vmess://";

const PROTOCOL: &str = "vmess";

/// Encodes a vmess record as a `vmess://` URI.
///
/// The JSON body always carries `v: "2"`, `type: "none"` and empty
/// `host`/`path`; an empty network is written as `tcp`.
#[must_use]
pub fn encode(record: &ProxyRecord) -> String {
    let network = if record.network.is_empty() {
        "tcp"
    } else {
        record.network.as_str()
    };
    let body = json!({
        "v": "2",
        "ps": record.name,
        "add": record.server,
        "port": record.port.to_string(),
        "id": record.uuid,
        "aid": record.alter_id.to_string(),
        "net": network,
        "type": "none",
        "host": "",
        "path": "",
        "tls": if record.tls { "tls" } else { "" },
    });
    format!("{SCHEME}{}", encode_base64(&body.to_string()))
}

/// Decodes a `vmess://` URI.
///
/// # Errors
///
/// Returns [`DecodeError`] when the body is not base64 or not a JSON object.
pub fn decode(uri: &str) -> Result<ProxyRecord, DecodeError> {
    let body = uri.strip_prefix(SCHEME).unwrap_or(uri).trim();
    let bytes = decode_padded(body).ok_or(DecodeError::InvalidBase64 { protocol: PROTOCOL })?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| DecodeError::InvalidJson {
        protocol: PROTOCOL,
        reason: e.to_string(),
    })?;
    let fields = value.as_object().ok_or_else(|| DecodeError::InvalidJson {
        protocol: PROTOCOL,
        reason: "expected a JSON object".to_string(),
    })?;

    let mut security = field(fields, "scy").text();
    if security.is_empty() {
        security = "none".to_string();
    }

    let record = ProxyRecord {
        protocol: Protocol::Vmess,
        name: field(fields, "ps").text(),
        server: field(fields, "add").text(),
        port: field(fields, "port").integer(),
        cipher: "auto".to_string(),
        uuid: field(fields, "id").text(),
        alter_id: field(fields, "aid").integer(),
        network: field(fields, "net").text(),
        tls: field(fields, "tls").text() == "tls",
        security,
        ..ProxyRecord::default()
    };
    Ok(record.with_default_name())
}

/// A JSON field that may arrive as a string, a number or not at all.
struct LooseField<'a>(Option<&'a Value>);

fn field<'a>(fields: &'a Map<String, Value>, key: &str) -> LooseField<'a> {
    LooseField(fields.get(key))
}

impl LooseField<'_> {
    fn text(&self) -> String {
        match self.0 {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Coerces to an integer type; out-of-range or unparsable values become 0.
    #[allow(clippy::cast_possible_truncation)]
    fn integer<T>(&self) -> T
    where
        T: TryFrom<i64> + Default,
    {
        let raw = match self.0 {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        raw.and_then(|v| T::try_from(v).ok()).unwrap_or_default()
    }
}

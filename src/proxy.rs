//! Proxy endpoint records shared by the URI codecs and the document codec.
//!
//! A [`ProxyRecord`] is the normalized form every conversion passes through:
//! structured documents deserialize into it, feed lines decode into it, and
//! both output formats are produced from it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol tag of a proxy record.
///
/// Documents may carry proxy types this crate does not convert (`vless`,
/// `hysteria2`, ...). Those are kept as [`Protocol::Other`] so the document
/// still parses, and are skipped during feed encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Protocol {
    /// Shadowsocks (`ss://`).
    Shadowsocks,
    /// VMess (`vmess://`).
    Vmess,
    /// Trojan (`trojan://`).
    Trojan,
    /// Any other type tag, preserved verbatim.
    Other(String),
}

impl Protocol {
    /// Returns the document type tag (`ss`, `vmess`, `trojan`, or the raw tag).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Shadowsocks => "ss",
            Self::Vmess => "vmess",
            Self::Trojan => "trojan",
            Self::Other(tag) => tag,
        }
    }

    /// Returns true for the protocols with a URI codec.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for Protocol {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "ss" => Self::Shadowsocks,
            "vmess" => Self::Vmess,
            "trojan" => Self::Trojan,
            _ => Self::Other(tag),
        }
    }
}

impl From<Protocol> for String {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One proxy endpoint.
///
/// Field names follow the Clash document format. Which optional fields are
/// meaningful depends on [`protocol`](Self::protocol): `cipher`/`password`
/// for shadowsocks, `uuid`/`alter_id`/`network`/`tls`/`security` for vmess,
/// `password` for trojan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyRecord {
    /// Protocol tag (`type` in documents).
    #[serde(rename = "type")]
    pub protocol: Protocol,
    /// Display name.
    pub name: String,
    /// Server host name or address.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Shadowsocks or trojan password.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Shadowsocks cipher; fixed to `auto` for decoded vmess records.
    pub cipher: String,
    /// VMess user id.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    /// VMess alter id.
    #[serde(rename = "alterId")]
    pub alter_id: u32,
    /// VMess transport network (`tcp`, `ws`, ...).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub network: String,
    /// VMess TLS flag.
    #[serde(skip_serializing_if = "is_false")]
    pub tls: bool,
    /// VMess security setting.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub security: String,
}

impl ProxyRecord {
    /// Creates a shadowsocks record. An empty name defaults to `host:port`.
    #[must_use]
    pub fn shadowsocks(
        name: impl Into<String>,
        server: impl Into<String>,
        port: u16,
        cipher: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            protocol: Protocol::Shadowsocks,
            name: name.into(),
            server: server.into(),
            port,
            cipher: cipher.into(),
            password: password.into(),
            ..Self::default()
        }
        .with_default_name()
    }

    /// Creates a vmess record with `auto` cipher. An empty name defaults to `host:port`.
    #[must_use]
    pub fn vmess(
        name: impl Into<String>,
        server: impl Into<String>,
        port: u16,
        uuid: impl Into<String>,
        alter_id: u32,
    ) -> Self {
        Self {
            protocol: Protocol::Vmess,
            name: name.into(),
            server: server.into(),
            port,
            cipher: "auto".to_string(),
            uuid: uuid.into(),
            alter_id,
            ..Self::default()
        }
        .with_default_name()
    }

    /// Creates a trojan record. An empty name defaults to `host:port`.
    #[must_use]
    pub fn trojan(
        name: impl Into<String>,
        server: impl Into<String>,
        port: u16,
        password: impl Into<String>,
    ) -> Self {
        Self {
            protocol: Protocol::Trojan,
            name: name.into(),
            server: server.into(),
            port,
            password: password.into(),
            ..Self::default()
        }
        .with_default_name()
    }

    /// Sets the vmess transport network.
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Sets the vmess TLS flag.
    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    /// Fills an empty name with `host:port`.
    #[must_use]
    pub fn with_default_name(mut self) -> Self {
        if self.name.is_empty() {
            self.name = self.endpoint();
        }
        self
    }
}

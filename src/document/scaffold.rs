//! Fixed routing scaffold for documents synthesized from a feed.
//!
//! None of this is derived from the input except the proxy names listed in
//! the selector and auto-test groups.

use serde::{Deserialize, Serialize};

use super::{DocumentError, StructuredDocument};
use crate::proxy::ProxyRecord;

/// Manual selection group: auto-test, direct, then every proxy.
pub const SELECTOR_GROUP: &str = "🔰 Proxy";
/// Latency-tested group over every proxy.
pub const AUTO_TEST_GROUP: &str = "♻️ Auto";
/// Group that only routes direct.
pub const DIRECT_GROUP: &str = "🎯 Direct";
/// Group that only rejects.
pub const REJECT_GROUP: &str = "🛑 Reject";
/// Catch-all group for unmatched traffic.
pub const FALLBACK_GROUP: &str = "🐟 Final";

const PROBE_URL: &str = "http://www.gstatic.com/generate_204";
const PROBE_INTERVAL_SECS: u32 = 300;

/// A proxy group entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyGroup {
    /// Group name referenced by rules and other groups.
    pub name: String,
    /// Group type (`select`, `url-test`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Member names: proxies, other groups, or `DIRECT`/`REJECT`.
    #[serde(default)]
    pub proxies: Vec<String>,
    /// Latency probe URL for `url-test` groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Probe interval in seconds for `url-test` groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
}

impl ProxyGroup {
    fn select(name: &str, members: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            kind: "select".to_string(),
            proxies: members,
            url: None,
            interval: None,
        }
    }

    fn url_test(name: &str, members: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            kind: "url-test".to_string(),
            proxies: members,
            url: Some(PROBE_URL.to_string()),
            interval: Some(PROBE_INTERVAL_SECS),
        }
    }
}

/// DNS block of a synthesized document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DnsSettings {
    pub enable: bool,
    pub ipv6: bool,
    pub default_nameserver: Vec<String>,
    pub enhanced_mode: String,
    pub fake_ip_range: String,
    pub nameserver: Vec<String>,
    pub fallback: Vec<String>,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            enable: true,
            ipv6: false,
            default_nameserver: strings(&["223.5.5.5", "119.29.29.29"]),
            enhanced_mode: "fake-ip".to_string(),
            fake_ip_range: "198.18.0.1/16".to_string(),
            nameserver: strings(&["https://doh.pub/dns-query", "https://dns.alidns.com/dns-query"]),
            fallback: strings(&[
                "https://cloudflare-dns.com/dns-query",
                "https://dns.google/dns-query",
            ]),
        }
    }
}

/// A complete, immediately usable document.
///
/// Listener settings and DNS come first, followed by the proxies, the five
/// fixed groups and the fixed rule list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SynthesizedDocument {
    pub port: u16,
    pub socks_port: u16,
    pub mixed_port: u16,
    pub allow_lan: bool,
    pub mode: String,
    pub log_level: String,
    pub external_controller: String,
    pub dns: DnsSettings,
    #[serde(flatten)]
    pub body: StructuredDocument,
}

impl SynthesizedDocument {
    /// Wraps records in the fixed scaffold.
    #[must_use]
    pub fn from_records(proxies: Vec<ProxyRecord>) -> Self {
        let names: Vec<String> = proxies.iter().map(|p| p.name.clone()).collect();

        let mut selector = strings(&[AUTO_TEST_GROUP, DIRECT_GROUP]);
        selector.extend(names.iter().cloned());

        let proxy_groups = vec![
            ProxyGroup::select(SELECTOR_GROUP, selector),
            ProxyGroup::url_test(AUTO_TEST_GROUP, names),
            ProxyGroup::select(DIRECT_GROUP, strings(&["DIRECT"])),
            ProxyGroup::select(REJECT_GROUP, strings(&["REJECT"])),
            ProxyGroup::select(FALLBACK_GROUP, strings(&[SELECTOR_GROUP, DIRECT_GROUP])),
        ];

        Self {
            port: 7890,
            socks_port: 7891,
            mixed_port: 7892,
            allow_lan: false,
            mode: "Rule".to_string(),
            log_level: "info".to_string(),
            external_controller: "127.0.0.1:9090".to_string(),
            dns: DnsSettings::default(),
            body: StructuredDocument {
                proxies,
                proxy_groups,
                rules: default_rules(),
            },
        }
    }

    /// Writes the document as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Serialize`] if YAML emission fails.
    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        serde_yaml::to_string(self).map_err(|source| DocumentError::Serialize { source })
    }
}

fn default_rules() -> Vec<String> {
    let mut rules = vec![
        format!("RULE-SET,reject,{REJECT_GROUP}"),
        format!("RULE-SET,china,{DIRECT_GROUP}"),
        format!("RULE-SET,cncidr,{DIRECT_GROUP}"),
        format!("RULE-SET,proxy,{SELECTOR_GROUP}"),
        format!("RULE-SET,telegramcidr,{SELECTOR_GROUP}"),
    ];
    for cidr in ["127.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16", "10.0.0.0/8"] {
        rules.push(format!("IP-CIDR,{cidr},{DIRECT_GROUP}"));
    }
    rules.push(format!("GEOIP,CN,{DIRECT_GROUP}"));
    rules.push(format!("MATCH,{FALLBACK_GROUP}"));
    rules
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<ProxyRecord> {
        (0..n)
            .map(|i| ProxyRecord::trojan(format!("node-{i}"), "t.example.com", 443, "pw"))
            .collect()
    }

    #[test]
    fn test_scaffold_has_five_groups_in_order() {
        let doc = SynthesizedDocument::from_records(records(3));
        let names: Vec<&str> = doc.body.proxy_groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec![SELECTOR_GROUP, AUTO_TEST_GROUP, DIRECT_GROUP, REJECT_GROUP, FALLBACK_GROUP]
        );
    }

    #[test]
    fn test_selector_lists_synthetic_targets_first() {
        let doc = SynthesizedDocument::from_records(records(2));
        let selector = doc.body.group(SELECTOR_GROUP).unwrap();
        assert_eq!(
            selector.proxies,
            vec![AUTO_TEST_GROUP, DIRECT_GROUP, "node-0", "node-1"]
        );
    }

    #[test]
    fn test_auto_test_group_probes_fixed_url() {
        let doc = SynthesizedDocument::from_records(records(2));
        let auto = doc.body.group(AUTO_TEST_GROUP).unwrap();
        assert_eq!(auto.kind, "url-test");
        assert_eq!(auto.url.as_deref(), Some(PROBE_URL));
        assert_eq!(auto.interval, Some(300));
        assert_eq!(auto.proxies.len(), 2);
    }

    #[test]
    fn test_rules_end_with_catch_all() {
        let rules = default_rules();
        assert_eq!(rules.len(), 11);
        assert_eq!(rules[0], format!("RULE-SET,reject,{REJECT_GROUP}"));
        assert_eq!(rules[9], format!("GEOIP,CN,{DIRECT_GROUP}"));
        assert_eq!(rules.last().unwrap(), &format!("MATCH,{FALLBACK_GROUP}"));
    }

    #[test]
    fn test_yaml_contains_listener_and_dns_blocks() {
        let yaml = SynthesizedDocument::from_records(records(1)).to_yaml().unwrap();
        assert!(yaml.contains("mixed-port: 7892"));
        assert!(yaml.contains("external-controller: 127.0.0.1:9090"));
        assert!(yaml.contains("enhanced-mode: fake-ip"));
        assert!(yaml.contains("fake-ip-range: 198.18.0.1/16"));
        let reparsed = StructuredDocument::parse(&yaml).unwrap();
        assert_eq!(reparsed.proxies.len(), 1);
        assert_eq!(reparsed.proxy_groups.len(), 5);
    }
}

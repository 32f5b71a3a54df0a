//! User-Agent string for subscription fetches.
//!
//! Many subscription providers only serve browser-looking clients, so the
//! default is a fixed desktop-browser UA rather than one naming this tool.

/// Default User-Agent sent with every subscription fetch.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Returns `configured` when non-blank, otherwise [`DEFAULT_USER_AGENT`].
#[must_use]
pub fn resolve_user_agent(configured: Option<&str>) -> String {
    configured
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .unwrap_or(DEFAULT_USER_AGENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent_looks_like_a_browser() {
        assert!(DEFAULT_USER_AGENT.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_resolve_user_agent_prefers_configured_value() {
        assert_eq!(resolve_user_agent(Some("clash/1.0")), "clash/1.0");
    }

    #[test]
    fn test_resolve_user_agent_falls_back_on_blank() {
        assert_eq!(resolve_user_agent(Some("  ")), DEFAULT_USER_AGENT);
        assert_eq!(resolve_user_agent(None), DEFAULT_USER_AGENT);
    }
}

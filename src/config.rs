//! Runtime configuration shared by every provider adapter.
//!
//! Adapters receive a `Settings` at construction; nothing reads the
//! environment behind their back.

use std::fmt;
use std::time::Duration;

/// OpenAlex API base URL
pub const OPENALEX_API_BASE: &str = "https://api.openalex.org";
/// Crossref API base URL
pub const CROSSREF_API_BASE: &str = "https://api.crossref.org";
/// arXiv export API query endpoint
pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";
/// Semantic Scholar graph API base URL
pub const SEMANTIC_SCHOLAR_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";
/// Serper.dev Google Scholar endpoint
pub const SERPER_SCHOLAR_URL: &str = "https://google.serper.dev/scholar";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the web-scale engine key
pub const ENV_SERPER_API_KEY: &str = "SERPER_API_KEY";
/// Environment variable holding the polite-pool contact email
pub const ENV_MAILTO: &str = "SCHOLARHUB_MAILTO";
/// Environment variable holding an optional Semantic Scholar key
pub const ENV_SEMANTIC_API_KEY: &str = "SEMANTIC_SCHOLAR_API_KEY";
/// Environment variable overriding the request timeout
pub const ENV_TIMEOUT_SECS: &str = "SCHOLARHUB_TIMEOUT_SECS";

/// Provider endpoints, credentials and transport knobs.
#[derive(Clone)]
pub struct Settings {
    pub openalex_base: String,
    pub crossref_base: String,
    pub arxiv_base: String,
    pub semantic_base: String,
    pub serper_endpoint: String,
    /// Contact email sent as `mailto` to providers with a polite pool
    pub contact_email: Option<String>,
    /// Secret for the web-scale engine; never echoed to callers
    pub serper_api_key: Option<String>,
    pub semantic_api_key: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openalex_base: OPENALEX_API_BASE.to_string(),
            crossref_base: CROSSREF_API_BASE.to_string(),
            arxiv_base: ARXIV_API_URL.to_string(),
            semantic_base: SEMANTIC_SCHOLAR_API_BASE.to_string(),
            serper_endpoint: SERPER_SCHOLAR_URL.to_string(),
            contact_email: None,
            serper_api_key: None,
            semantic_api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("scholarhub/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Settings {
    /// Defaults overlaid with whatever the process environment provides.
    pub fn from_env() -> Self {
        Self::default().with_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup. Empty values count as unset.
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_SERPER_API_KEY) {
            self.serper_api_key = Some(key);
        }
        if let Some(mail) = get(ENV_MAILTO) {
            self.contact_email = Some(mail);
        }
        if let Some(key) = get(ENV_SEMANTIC_API_KEY) {
            self.semantic_api_key = Some(key);
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS).and_then(|v| v.parse::<u64>().ok()) {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(mail) = &self.contact_email {
            self.user_agent = format!("scholarhub/{} (mailto:{})", env!("CARGO_PKG_VERSION"), mail);
        }
        self
    }

    /// Point every provider at one base URL (mock servers in tests).
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.openalex_base = base.to_string();
        self.crossref_base = base.to_string();
        self.arxiv_base = format!("{}/api/query", base);
        self.semantic_base = format!("{}/graph/v1", base);
        self.serper_endpoint = format!("{}/scholar", base);
        self
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Settings")
            .field("openalex_base", &self.openalex_base)
            .field("crossref_base", &self.crossref_base)
            .field("arxiv_base", &self.arxiv_base)
            .field("semantic_base", &self.semantic_base)
            .field("serper_endpoint", &self.serper_endpoint)
            .field("contact_email", &self.contact_email)
            .field("serper_api_key", &redact(&self.serper_api_key))
            .field("semantic_api_key", &redact(&self.semantic_api_key))
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_lookup_overlays_values() {
        let settings = Settings::default().with_lookup(lookup(&[
            (ENV_SERPER_API_KEY, "secret"),
            (ENV_MAILTO, "me@example.org"),
            (ENV_TIMEOUT_SECS, "5"),
        ]));
        assert_eq!(settings.serper_api_key.as_deref(), Some("secret"));
        assert_eq!(settings.contact_email.as_deref(), Some("me@example.org"));
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert!(settings.user_agent.contains("mailto:me@example.org"));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let settings = Settings::default().with_lookup(lookup(&[(ENV_SERPER_API_KEY, "  ")]));
        assert!(settings.serper_api_key.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = Settings {
            serper_api_key: Some("top-secret".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", settings);
        assert!(!printed.contains("top-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_with_base_url() {
        let settings = Settings::default().with_base_url("http://127.0.0.1:9999/");
        assert_eq!(settings.crossref_base, "http://127.0.0.1:9999");
        assert_eq!(settings.arxiv_base, "http://127.0.0.1:9999/api/query");
        assert_eq!(settings.serper_endpoint, "http://127.0.0.1:9999/scholar");
    }
}

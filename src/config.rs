//! Configuration types for the sitemap relay.

use serde::{Deserialize, Serialize};

/// Environment variable naming the origin domain.
pub const ORIGIN_DOMAIN_VAR: &str = "ORIGIN_DOMAIN";

/// Main configuration for the sitemap relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Configuration version
    pub version: String,
    /// Operational settings
    pub settings: Settings,
    /// Sitemap edit rules
    pub edits: EditRules,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            settings: Settings::default(),
            edits: EditRules::default(),
        }
    }
}

impl RelayConfig {
    /// Resolve the per-request view of the configuration.
    ///
    /// Reads the origin domain from `ORIGIN_DOMAIN` and makes relative
    /// removal patterns and added URLs absolute against it. The variable
    /// is read on every call so it can change without a restart.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        self.resolve_with_origin(std::env::var(ORIGIN_DOMAIN_VAR).ok())
    }

    fn resolve_with_origin(&self, origin: Option<String>) -> Result<ResolvedConfig, ConfigError> {
        let origin = origin
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingOriginDomain)?;

        let source_url = match &self.settings.source_url {
            Some(url) => url.clone(),
            None => format!("{origin}{}", self.settings.source_path),
        };

        Ok(ResolvedConfig {
            remove_patterns: self
                .edits
                .remove
                .iter()
                .map(|pattern| absolutize(pattern, &origin))
                .collect(),
            add_urls: self
                .edits
                .add
                .iter()
                .map(|url| absolutize(url, &origin))
                .collect(),
            domain_replacement: self.edits.replace_domain.clone(),
            source_url,
            origin,
        })
    }
}

/// Prefix a relative pattern or URL with the origin domain.
fn absolutize(value: &str, origin: &str) -> String {
    if value.starts_with("http") {
        value.to_string()
    } else {
        format!("{origin}{value}")
    }
}

/// Operational settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bind address of the inbound HTTP server
    pub listen: String,
    /// Path the transformed sitemap is served on
    pub serve_path: String,
    /// Explicit upstream sitemap URL; derived from the origin domain when absent
    pub source_url: Option<String>,
    /// Path appended to the origin domain when `source_url` is absent
    pub source_path: String,
    /// Upstream request timeout (seconds)
    pub fetch_timeout_secs: u64,
    /// Upstream connect timeout (seconds)
    pub connect_timeout_secs: u64,
    /// User-Agent sent with upstream requests
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            serve_path: "/sitemap.xml".to_string(),
            source_url: None,
            source_path: "/sitemap.xml".to_string(),
            fetch_timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: concat!("sitemap-relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Sitemap edit rules.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EditRules {
    /// Entries matching any of these patterns are removed. `*` matches
    /// within one path segment, `**` across segments. Relative patterns
    /// are resolved against the origin domain.
    pub remove: Vec<String>,
    /// URLs appended after removal; relative values are resolved against
    /// the origin domain
    pub add: Vec<String>,
    /// When non-empty, replaces the origin domain prefix of surviving entries
    pub replace_domain: String,
}

/// Per-request resolved configuration.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Origin domain taken from the environment
    pub origin: String,
    /// Absolute URL of the upstream sitemap
    pub source_url: String,
    /// Removal patterns, relative entries made absolute
    pub remove_patterns: Vec<String>,
    /// URLs to append, relative entries made absolute
    pub add_urls: Vec<String>,
    /// Replacement for the origin domain prefix, empty for no rewrite
    pub domain_replacement: String,
}

/// Errors that can occur while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ORIGIN_DOMAIN environment variable is not set")]
    MissingOriginDomain,
}

//! Sitemap relay implementation.

use crate::codec::{self, CodecError};
use crate::config::{ConfigError, RelayConfig};
use crate::fetch::{FetchError, HttpFetcher, SitemapFetcher};
use crate::matcher::{PatternError, UrlPattern};
use crate::transformer::SitemapTransformer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Sitemap relay.
///
/// Serves an edited copy of the origin's sitemap: entries matching the
/// removal patterns are dropped, configured URLs are appended, and the
/// origin domain prefix is rewritten on what survives.
pub struct SitemapRelay {
    /// Configuration
    config: RelayConfig,
    /// Upstream fetcher
    fetcher: Arc<dyn SitemapFetcher>,
    /// Metrics: total sitemap requests processed.
    requests_total: AtomicU64,
    /// Metrics: total sitemap requests that failed.
    requests_failed: AtomicU64,
}

impl SitemapRelay {
    /// Create a new relay from configuration.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let fetcher = HttpFetcher::new(&config.settings)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create a relay with a custom fetcher implementation.
    pub fn with_fetcher(config: RelayConfig, fetcher: Arc<dyn SitemapFetcher>) -> Self {
        info!(
            remove_patterns = config.edits.remove.len(),
            add_urls = config.edits.add.len(),
            replace_domain = !config.edits.replace_domain.is_empty(),
            "Sitemap relay initialized"
        );

        Self {
            config,
            fetcher,
            requests_total: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
        }
    }

    /// Create from a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RelayError> {
        let config: RelayConfig = serde_yaml::from_str(yaml)?;
        Self::new(config)
    }

    /// Create from a JSON configuration string.
    pub fn from_json(json: &str) -> Result<Self, RelayError> {
        let config: RelayConfig = serde_json::from_str(json)?;
        Self::new(config)
    }

    /// The loaded configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Number of sitemap requests processed so far.
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Number of sitemap requests that failed.
    pub fn requests_failed(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    /// Compile every configured removal pattern and return the ones that
    /// would be skipped at request time, with their compile errors.
    pub fn invalid_remove_patterns(&self) -> Vec<(String, PatternError)> {
        self.config
            .edits
            .remove
            .iter()
            .filter_map(|pattern| {
                UrlPattern::compile(pattern)
                    .err()
                    .map(|error| (pattern.clone(), error))
            })
            .collect()
    }

    /// Produce the transformed sitemap for one request.
    ///
    /// Fetches the upstream document, applies the edit pipeline and returns
    /// the re-encoded XML. Every step runs per request, so configuration
    /// resolution picks up environment changes without a restart.
    pub async fn serve_sitemap(&self) -> Result<String, RelayError> {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        match self.process().await {
            Ok(xml) => Ok(xml),
            Err(error) => {
                self.requests_failed.fetch_add(1, Ordering::Relaxed);
                Err(error)
            }
        }
    }

    async fn process(&self) -> Result<String, RelayError> {
        let resolved = self.config.resolve()?;

        debug!(source_url = %resolved.source_url, "Fetching source sitemap");
        let body = self.fetcher.fetch(&resolved.source_url).await?;

        let mut doc = codec::decode(&body)?;
        let transformer = SitemapTransformer::new(&resolved);
        let summary = transformer.transform(&mut doc);
        let encoded = codec::encode(&doc)?;

        info!(
            removed = summary.removed,
            added = summary.added,
            rewritten = summary.rewritten,
            entries = doc.entry_count(),
            "Transformed sitemap"
        );

        Ok(encoded)
    }
}

/// Sitemap relay errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

//! Upstream sitemap retrieval.

use crate::config::Settings;
use async_trait::async_trait;
use std::time::Duration;

/// Retrieves the source sitemap body.
#[async_trait]
pub trait SitemapFetcher: Send + Sync {
    /// Fetch the document at `url`, failing on any non-success status.
    /// Fetches are never retried.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher used in production.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build the fetcher from settings.
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = reqwest::ClientBuilder::new()
            .use_rustls_tls()
            .timeout(Duration::from_secs(settings.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SitemapFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Errors retrieving the upstream sitemap.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status}")]
    Status { status: u16 },
}

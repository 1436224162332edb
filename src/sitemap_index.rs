//! Count of sitemaps listed in the published sitemap index.

use std::time::Duration;

use thiserror::Error;

use crate::reports::CancelToken;
use crate::storage::xml;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),
}

/// Number of `<sitemap>` entries in a sitemap index document.
pub fn count_sitemaps(xml: &str) -> usize {
    xml::count_elements(xml, "sitemap")
}

/// Fetch `url` and count its sitemaps.
///
/// Returns `Ok(None)` if `cancel` fires first; the request is dropped.
pub async fn probe_sitemap_count(
    client: &reqwest::Client,
    url: &str,
    cancel: &CancelToken,
) -> Result<Option<usize>, ProbeError> {
    let request = async {
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        Ok(count_sitemaps(&body))
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(None),
        result = request => result.map(Some),
    }
}

/// A configured sitemap index location plus the client to fetch it.
#[derive(Debug, Clone)]
pub struct SitemapIndexProbe {
    client: reqwest::Client,
    url: String,
}

impl SitemapIndexProbe {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("crawl-status/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn run(&self, cancel: &CancelToken) -> Result<Option<usize>, ProbeError> {
        probe_sitemap_count(&self.client, &self.url, cancel).await
    }
}

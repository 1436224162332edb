//! Object storage backends holding crawl report files.
//!
//! Two backends implement [`ReportStore`]:
//! - [`MinioStore`]: local S3-compatible server for development
//! - [`GcsStore`]: anonymous reads from the public GCS JSON API
//!
//! The backend is chosen once at startup by [`create_store`].

mod gcs;
pub mod memory;
mod minio;
pub mod sigv4;
pub mod xml;

pub use gcs::{GcsStore, GCS_API_BASE};
pub use memory::MemoryStore;
pub use minio::MinioStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::Settings;

/// Errors from listing or reading objects.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid listing response: {0}")]
    InvalidListing(String),

    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// One object in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    /// Modification time as reported by the listing, if the backend has it.
    pub updated: Option<DateTime<Utc>>,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            updated: None,
        }
    }

    /// Whether the object is a crawl report.
    pub fn is_report(&self) -> bool {
        is_report_key(&self.key)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub entries: Vec<ObjectEntry>,
    /// Continuation token for the next page, `None` on the last page.
    pub next_token: Option<String>,
}

/// Body and metadata of a fetched object.
#[derive(Debug, Clone, Default)]
pub struct FetchedObject {
    pub body: Vec<u8>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Report files are the `.json` objects under the prefix.
pub fn is_report_key(key: &str) -> bool {
    key.ends_with(".json")
}

/// Read access to a bucket of report files.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Human-readable location, used in error banners.
    fn describe(&self) -> String;

    /// List objects under `prefix`, at most `max_results` per call.
    async fn list(
        &self,
        prefix: &str,
        max_results: usize,
        token: Option<&str>,
    ) -> Result<ObjectPage, StorageError>;

    /// Read one object.
    async fn fetch(&self, key: &str) -> Result<FetchedObject, StorageError>;
}

/// Build the HTTP client shared by the network backends.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, StorageError> {
    reqwest::Client::builder()
        .user_agent(concat!("crawl-status/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .gzip(true)
        .build()
        .map_err(StorageError::Client)
}

/// Turn a response into an error unless it is 2xx.
pub(crate) fn check_status(
    url: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(StorageError::NotFound(url.to_string()));
    }
    if !status.is_success() {
        return Err(StorageError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// Select the backend for the configured environment.
pub fn create_store(settings: &Settings) -> Result<Arc<dyn ReportStore>, StorageError> {
    let timeout = Duration::from_secs(settings.request_timeout);

    if settings.use_gcp {
        tracing::info!("Reading reports from GCS bucket {}", settings.bucket());
        Ok(Arc::new(GcsStore::new(
            &settings.gcs_api_base,
            settings.bucket(),
            timeout,
        )?))
    } else {
        tracing::info!(
            "Reading reports from {} bucket {}",
            settings.minio_endpoint,
            settings.bucket()
        );
        Ok(Arc::new(MinioStore::new(
            &settings.minio_endpoint,
            settings.bucket(),
            settings.credentials(),
            timeout,
        )?))
    }
}

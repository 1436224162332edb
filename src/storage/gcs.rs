//! Anonymous reads from a public Google Cloud Storage bucket.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::sigv4::encode_path;
use super::{
    check_status, http_client, FetchedObject, ObjectEntry, ObjectPage, ReportStore, StorageError,
};

/// Default public endpoint.
pub const GCS_API_BASE: &str = "https://storage.googleapis.com";

/// Response of `GET /storage/v1/b/{bucket}/o`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    name: String,
    updated: Option<String>,
}

/// Public GCS bucket store.
pub struct GcsStore {
    client: Client,
    api_base: String,
    bucket: String,
}

impl GcsStore {
    pub fn new(api_base: &str, bucket: &str, timeout: Duration) -> Result<Self, StorageError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn list_url(&self, prefix: &str, max_results: usize, token: Option<&str>) -> String {
        let mut url = format!(
            "{}/storage/v1/b/{}/o?prefix={}&maxResults={}",
            self.api_base,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(prefix),
            max_results
        );
        if let Some(token) = token {
            url.push_str("&pageToken=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.api_base,
            urlencoding::encode(&self.bucket),
            encode_path(key)
        )
    }
}

/// Parse the JSON listing body.
pub(crate) fn parse_list_response(body: &str) -> Result<ObjectPage, StorageError> {
    let parsed: ListResponse =
        serde_json::from_str(body).map_err(|e| StorageError::InvalidListing(e.to_string()))?;

    let entries = parsed
        .items
        .into_iter()
        .map(|item| ObjectEntry {
            updated: item
                .updated
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            key: item.name,
        })
        .collect();

    Ok(ObjectPage {
        entries,
        next_token: parsed.next_page_token.filter(|t| !t.is_empty()),
    })
}

#[async_trait]
impl ReportStore for GcsStore {
    fn describe(&self) -> String {
        format!("{}/{}", self.api_base, self.bucket)
    }

    async fn list(
        &self,
        prefix: &str,
        max_results: usize,
        token: Option<&str>,
    ) -> Result<ObjectPage, StorageError> {
        let url = self.list_url(prefix, max_results, token);
        tracing::debug!("Listing {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| StorageError::Transport {
                url: url.clone(),
                source,
            })?;
        let response = check_status(&url, response)?;
        let body = response
            .text()
            .await
            .map_err(|source| StorageError::Transport { url, source })?;

        parse_list_response(&body)
    }

    async fn fetch(&self, key: &str) -> Result<FetchedObject, StorageError> {
        let url = self.object_url(key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| StorageError::Transport {
                url: url.clone(),
                source,
            })?;
        let response = check_status(&url, response)?;
        let body = response
            .bytes()
            .await
            .map_err(|source| StorageError::Transport { url, source })?;

        // The object read carries no timestamp we use; the listing's
        // `updated` field is authoritative.
        Ok(FetchedObject {
            body: body.to_vec(),
            last_modified: None,
        })
    }
}

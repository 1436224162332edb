//! S3-compatible backend for a local MinIO server.
//!
//! Uses path-style addressing (`{endpoint}/{bucket}/{key}`) and signs every
//! request with the configured static credentials.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use url::Url;

use super::sigv4::{self, Credentials};
use super::xml::{element_blocks, first_element_text};
use super::{
    check_status, http_client, FetchedObject, ObjectEntry, ObjectPage, ReportStore, StorageError,
};

/// MinIO (or any S3 `ListObjectsV2` speaker) store.
pub struct MinioStore {
    client: Client,
    endpoint: Url,
    host: String,
    bucket: String,
    credentials: Credentials,
}

impl MinioStore {
    pub fn new(
        endpoint: &str,
        bucket: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StorageError::Endpoint(format!("{}: {}", endpoint, e)))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => return Err(StorageError::Endpoint(endpoint.to_string())),
        };

        Ok(Self {
            client: http_client(timeout)?,
            endpoint,
            host,
            bucket: bucket.to_string(),
            credentials,
        })
    }

    fn base(&self) -> &str {
        self.endpoint.as_str().trim_end_matches('/')
    }

    /// Send a signed GET for `path` (already encoded) and `query` (canonical).
    async fn signed_get(&self, path: &str, query: &str) -> Result<reqwest::Response, StorageError> {
        let url = if query.is_empty() {
            format!("{}{}", self.base(), path)
        } else {
            format!("{}{}?{}", self.base(), path, query)
        };

        let signed = sigv4::sign(&self.credentials, "GET", &self.host, path, query, Utc::now());

        let response = self
            .client
            .get(&url)
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", &signed.content_sha256)
            .header("authorization", &signed.authorization)
            .send()
            .await
            .map_err(|source| StorageError::Transport {
                url: url.clone(),
                source,
            })?;

        check_status(&url, response)
    }
}

/// Parse a `ListObjectsV2` XML response.
pub(crate) fn parse_list_response(xml: &str) -> Result<ObjectPage, StorageError> {
    if !xml.contains("<ListBucketResult") {
        return Err(StorageError::InvalidListing(
            "missing ListBucketResult element".to_string(),
        ));
    }

    let mut entries = Vec::new();
    for contents in element_blocks(xml, "Contents") {
        let Some(key) = first_element_text(contents, "Key") else {
            continue;
        };
        let updated = first_element_text(contents, "LastModified")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        entries.push(ObjectEntry { key, updated });
    }

    let truncated = first_element_text(xml, "IsTruncated").is_some_and(|t| t == "true");
    let next_token = if truncated {
        first_element_text(xml, "NextContinuationToken").filter(|t| !t.is_empty())
    } else {
        None
    };

    Ok(ObjectPage {
        entries,
        next_token,
    })
}

#[async_trait]
impl ReportStore for MinioStore {
    fn describe(&self) -> String {
        format!("{}/{}", self.base(), self.bucket)
    }

    async fn list(
        &self,
        prefix: &str,
        max_results: usize,
        token: Option<&str>,
    ) -> Result<ObjectPage, StorageError> {
        let max_keys = max_results.to_string();
        let mut params = vec![
            ("list-type", "2"),
            ("prefix", prefix),
            ("max-keys", max_keys.as_str()),
        ];
        if let Some(token) = token {
            params.push(("continuation-token", token));
        }

        let path = sigv4::encode_path(&format!("/{}", self.bucket));
        let query = sigv4::canonical_query(&params);

        tracing::debug!("Listing {} (token: {:?})", self.describe(), token);
        let response = self.signed_get(&path, &query).await?;
        let url = format!("{}{}?{}", self.base(), path, query);
        let text = response
            .text()
            .await
            .map_err(|source| StorageError::Transport { url, source })?;

        parse_list_response(&text)
    }

    async fn fetch(&self, key: &str) -> Result<FetchedObject, StorageError> {
        let path = sigv4::encode_path(&format!("/{}/{}", self.bucket, key));
        let response = self.signed_get(&path, "").await?;

        let last_modified = response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let url = format!("{}{}", self.base(), path);
        let body = response
            .bytes()
            .await
            .map_err(|source| StorageError::Transport { url, source })?;

        Ok(FetchedObject {
            body: body.to_vec(),
            last_modified,
        })
    }
}

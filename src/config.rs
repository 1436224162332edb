//! Configuration management for crawl-status using the prefer crate.
//!
//! Settings are layered: built-in defaults, then an optional config file
//! (discovered by prefer or passed explicitly), then environment variables,
//! then CLI flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::sigv4::Credentials;

/// Public bucket holding production reports.
pub const DEFAULT_GCS_BUCKET: &str = "metadata-geoconnex-us";
/// Bucket used on a local MinIO.
pub const DEFAULT_LOCAL_BUCKET: &str = "iow-metadata";
/// Object prefix the harvester writes reports under.
pub const DEFAULT_PREFIX: &str = "metadata/sitemaps";
pub const DEFAULT_MINIO_ENDPOINT: &str = "http://localhost:9000";
pub const DEFAULT_SITEMAP_INDEX: &str = "https://geoconnex.us/sitemap.xml";
pub const DEFAULT_BIND: &str = "127.0.0.1:3030";

/// Environment variables read by [`Settings::apply_env`].
pub const ENV_USE_GCP: &str = "CRAWL_STATUS_USE_GCP";
pub const ENV_LOCAL_BUCKET: &str = "CRAWL_STATUS_LOCAL_BUCKET";
pub const ENV_PREFIX: &str = "CRAWL_STATUS_PREFIX";
pub const ENV_MINIO_ENDPOINT: &str = "CRAWL_STATUS_MINIO_ENDPOINT";
pub const ENV_SITEMAP_INDEX: &str = "CRAWL_STATUS_SITEMAP_INDEX";

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Read from the public GCS bucket instead of local MinIO.
    pub use_gcp: bool,
    pub gcs_bucket: String,
    pub local_bucket: String,
    pub prefix: String,
    pub gcs_api_base: String,
    pub minio_endpoint: String,
    pub minio_region: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    /// Sitemap index to probe for the total sitemap count. `None` disables
    /// the probe.
    pub sitemap_index_url: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Address the web server binds to.
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_gcp: false,
            gcs_bucket: DEFAULT_GCS_BUCKET.to_string(),
            local_bucket: DEFAULT_LOCAL_BUCKET.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            gcs_api_base: crate::storage::GCS_API_BASE.to_string(),
            minio_endpoint: DEFAULT_MINIO_ENDPOINT.to_string(),
            minio_region: "us-east-1".to_string(),
            minio_access_key: "minioadmin".to_string(),
            minio_secret_key: "minioadmin".to_string(),
            sitemap_index_url: Some(DEFAULT_SITEMAP_INDEX.to_string()),
            request_timeout: 30,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Settings {
    /// Bucket for the selected backend.
    pub fn bucket(&self) -> &str {
        if self.use_gcp {
            &self.gcs_bucket
        } else {
            &self.local_bucket
        }
    }

    /// Credentials for the local S3-compatible backend.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_key: self.minio_access_key.clone(),
            secret_key: self.minio_secret_key.clone(),
            region: self.minio_region.clone(),
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_env(|name| std::env::var(name).ok());
        self
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(flag) = get(ENV_USE_GCP) {
            self.use_gcp = parse_flag(&flag);
        }
        if let Some(bucket) = get(ENV_LOCAL_BUCKET).filter(|s| !s.is_empty()) {
            self.local_bucket = bucket;
        }
        if let Some(prefix) = get(ENV_PREFIX).filter(|s| !s.is_empty()) {
            self.prefix = prefix;
        }
        if let Some(endpoint) = get(ENV_MINIO_ENDPOINT).filter(|s| !s.is_empty()) {
            self.minio_endpoint = endpoint;
        }
        if let Some(index) = get(ENV_SITEMAP_INDEX) {
            self.sitemap_index_url = Some(index).filter(|s| !s.is_empty());
        }
    }
}

impl Settings {
    /// Apply command-line flags, the last layer.
    ///
    /// `bucket` replaces the bucket of whichever backend ends up selected.
    pub fn with_cli_overrides(mut self, gcp: bool, bucket: Option<&str>) -> Self {
        if gcp {
            self.use_gcp = true;
        }
        if let Some(bucket) = bucket.filter(|b| !b.is_empty()) {
            if self.use_gcp {
                self.gcs_bucket = bucket.to_string();
            } else {
                self.local_bucket = bucket.to_string();
            }
        }
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_gcp: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "bucket")]
    pub local_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minio_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sitemap_index: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    pub async fn load() -> Self {
        match prefer::load("crawl-status").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(use_gcp) = self.use_gcp {
            settings.use_gcp = use_gcp;
        }
        if let Some(ref bucket) = self.gcs_bucket {
            settings.gcs_bucket = bucket.clone();
        }
        if let Some(ref bucket) = self.local_bucket {
            settings.local_bucket = bucket.clone();
        }
        if let Some(ref prefix) = self.prefix {
            settings.prefix = prefix.clone();
        }
        if let Some(ref endpoint) = self.minio_endpoint {
            settings.minio_endpoint = endpoint.clone();
        }
        if let Some(ref index) = self.sitemap_index {
            settings.sitemap_index_url = Some(index.clone()).filter(|s| !s.is_empty());
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Load settings: defaults, config file, then environment.
pub async fn load_settings(options: &LoadOptions) -> anyhow::Result<Settings> {
    let config = match &options.config_path {
        Some(path) => Config::load_from_path(path)
            .await
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?,
        None => Config::load().await,
    };

    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    Ok(settings.with_env_overrides())
}

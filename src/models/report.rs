//! Crawl report models as written by the harvester.
//!
//! Reports are serialized with PascalCase field names. The harvester has
//! also written lower-camel JSON-LD style names over time, so those are
//! accepted as aliases when reading.

use serde::{Deserialize, Deserializer, Serialize};

/// Outcome of SHACL validation for a harvested resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaclStatus {
    #[default]
    Skipped,
    Invalid,
    Valid,
}

impl ShaclStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Invalid => "invalid",
            Self::Valid => "valid",
        }
    }
}

impl std::str::FromStr for ShaclStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skipped" => Ok(Self::Skipped),
            "invalid" => Ok(Self::Invalid),
            "valid" => Ok(Self::Valid),
            _ => Err(format!(
                "Invalid SHACL status '{}'. Valid options: skipped, invalid, valid",
                s
            )),
        }
    }
}

impl std::fmt::Display for ShaclStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single URL that failed to harvest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlCrawlError {
    #[serde(rename = "Url", alias = "url")]
    pub url: String,
    /// HTTP status of the fetch. The harvester writes 0 when no response
    /// was received, which is not a real status.
    #[serde(rename = "Status", alias = "statusCode", default)]
    pub status: u16,
    #[serde(rename = "Message", alias = "description", default)]
    pub message: String,
    #[serde(rename = "ShaclStatus", alias = "shaclStatus", default)]
    pub shacl_status: ShaclStatus,
    #[serde(rename = "ShaclErrorMessage", alias = "shaclMessage", default)]
    pub shacl_error_message: String,
}

impl UrlCrawlError {
    /// Status text for display; 0 is suppressed.
    pub fn status_display(&self) -> String {
        if self.status == 0 {
            String::new()
        } else {
            self.status.to_string()
        }
    }
}

/// A SHACL warning for a URL that was still harvested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShaclInfo {
    #[serde(rename = "Url", alias = "url")]
    pub url: String,
    #[serde(rename = "ShaclStatus", alias = "shaclStatus", default)]
    pub shacl_status: ShaclStatus,
    #[serde(
        rename = "ShaclValidationMessage",
        alias = "shaclValidationMessage",
        default
    )]
    pub shacl_validation_message: String,
}

/// Aggregate SHACL warnings for one sitemap.
///
/// `shacl_warnings` is only a sample of the first few warnings; the full
/// count is `total_shacl_failures`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarningReport {
    #[serde(rename = "TotalShaclFailures", alias = "totalShaclFailures", default)]
    pub total_shacl_failures: usize,
    #[serde(
        rename = "ShaclWarnings",
        alias = "shaclWarnings",
        default,
        deserialize_with = "null_as_default"
    )]
    pub shacl_warnings: Vec<ShaclInfo>,
}

impl WarningReport {
    /// Whether the sample omits some warnings.
    pub fn is_truncated(&self) -> bool {
        self.shacl_warnings.len() < self.total_shacl_failures
    }

    /// Note shown next to every rendering of the sample.
    pub fn sample_note(&self) -> String {
        format!(
            "Displaying the first {} out of {} total warnings for the sake of brevity",
            self.shacl_warnings.len(),
            self.total_shacl_failures
        )
    }
}

/// Crawl outcome for one sitemap in the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SitemapCrawlStats {
    #[serde(rename = "SitemapName", alias = "name")]
    pub sitemap_name: String,
    #[serde(
        rename = "SuccessfulUrls",
        alias = "successfulUrls",
        default,
        deserialize_with = "null_as_default"
    )]
    pub successful_urls: Vec<String>,
    #[serde(
        rename = "CrawlFailures",
        alias = "crawlFailures",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub crawl_failures: Option<Vec<UrlCrawlError>>,
    #[serde(rename = "SecondsToComplete", alias = "duration", default)]
    pub seconds_to_complete: f64,
    #[serde(
        rename = "SitesHarvested",
        alias = "numberOfSitesHarvested",
        alias = "SuccessfulSites",
        default
    )]
    pub sites_harvested: u64,
    #[serde(rename = "SitesInSitemap", alias = "numberOfSitesInSitemap", default)]
    pub sites_in_sitemap: u64,
    #[serde(
        rename = "WarningStats",
        alias = "warningStats",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub warning_stats: Option<WarningReport>,
    #[serde(
        rename = "SitemapSourceLink",
        alias = "sitemapSourceLink",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sitemap_source_link: Option<String>,
    /// Set by the fetcher from object metadata, not by the harvester.
    #[serde(rename = "LastModified", default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl SitemapCrawlStats {
    /// Crawl failures, treating a missing list as empty.
    pub fn failures(&self) -> &[UrlCrawlError] {
        self.crawl_failures.as_deref().unwrap_or_default()
    }

    /// Warning report if it has anything to show.
    pub fn warnings(&self) -> Option<&WarningReport> {
        self.warning_stats
            .as_ref()
            .filter(|w| w.total_shacl_failures > 0 || !w.shacl_warnings.is_empty())
    }

    /// Date part of the last-modified stamp.
    pub fn last_modified_date(&self) -> &str {
        match self.last_modified.as_deref() {
            Some(stamp) => stamp.split('T').next().unwrap_or(stamp),
            None => "Unknown",
        }
    }

    /// Elapsed time formatted with two decimals.
    pub fn duration_display(&self) -> String {
        format!("{:.2}s", self.seconds_to_complete)
    }
}

/// Go writes nil slices as `null`; read them as empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pascal_case_report() {
        let json = r#"{
            "SitemapName": "iow/wqp/stations__5",
            "SuccessfulUrls": ["https://example.com/a"],
            "CrawlFailures": [
                {"Url": "https://example.com/b", "Status": 404, "Message": "not found",
                 "ShaclStatus": "invalid", "ShaclErrorMessage": "missing name"}
            ],
            "SecondsToComplete": 12.345,
            "SitesHarvested": 1,
            "SitesInSitemap": 2
        }"#;

        let stats: SitemapCrawlStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.sitemap_name, "iow/wqp/stations__5");
        assert_eq!(stats.successful_urls.len(), 1);
        assert_eq!(stats.failures().len(), 1);
        assert_eq!(stats.failures()[0].shacl_status, ShaclStatus::Invalid);
        assert_eq!(stats.sites_in_sitemap, 2);
        assert_eq!(stats.duration_display(), "12.35s");
    }

    #[test]
    fn test_parse_harvester_field_names() {
        let json = r#"{
            "@type": "DataFeed",
            "name": "ref/gages",
            "successfulUrls": null,
            "crawlFailures": [{"url": "https://example.com/x", "statusCode": 0,
                "description": "timeout", "shaclStatus": "skipped", "shaclMessage": ""}],
            "duration": 1.5,
            "numberOfSitesHarvested": 0,
            "numberOfSitesInSitemap": 1
        }"#;

        let stats: SitemapCrawlStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.sitemap_name, "ref/gages");
        assert!(stats.successful_urls.is_empty());
        assert_eq!(stats.failures()[0].message, "timeout");
        assert_eq!(stats.sites_in_sitemap, 1);
    }

    #[test]
    fn test_null_failures_are_absent() {
        let json = r#"{"SitemapName": "a", "CrawlFailures": null, "SuccessfulUrls": []}"#;
        let stats: SitemapCrawlStats = serde_json::from_str(json).unwrap();
        assert!(stats.crawl_failures.is_none());
        assert!(stats.failures().is_empty());
    }

    #[test]
    fn test_zero_status_is_blank() {
        let err = UrlCrawlError {
            url: "https://example.com".to_string(),
            status: 0,
            ..Default::default()
        };
        assert_eq!(err.status_display(), "");

        let err = UrlCrawlError {
            status: 500,
            ..err
        };
        assert_eq!(err.status_display(), "500");
    }

    #[test]
    fn test_warning_sample_note() {
        let report = WarningReport {
            total_shacl_failures: 40,
            shacl_warnings: vec![ShaclInfo::default(); 10],
        };
        assert!(report.is_truncated());
        assert_eq!(
            report.sample_note(),
            "Displaying the first 10 out of 40 total warnings for the sake of brevity"
        );
    }

    #[test]
    fn test_last_modified_date() {
        let mut stats = SitemapCrawlStats::default();
        assert_eq!(stats.last_modified_date(), "Unknown");

        stats.last_modified = Some("2025-06-01T10:00:00.000Z".to_string());
        assert_eq!(stats.last_modified_date(), "2025-06-01");
    }

    #[test]
    fn test_shacl_status_round_trip_names() {
        for status in [ShaclStatus::Skipped, ShaclStatus::Invalid, ShaclStatus::Valid] {
            assert_eq!(status.as_str().parse::<ShaclStatus>(), Ok(status));
        }
        assert!("bogus".parse::<ShaclStatus>().unwrap_err().contains("bogus"));
    }
}

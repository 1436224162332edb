//! Display rows for crawl reports, shared by the HTML views and the CLI.

use crate::models::{ItemStatus, ShaclInfo, SitemapCrawlStats, SitemapItemState, UrlCrawlError, WarningReport};
use crate::reports::PageSnapshot;

pub const DASHBOARD_TITLE: &str = "Geoconnex Crawl Status Dashboard";

/// One row of the failure table.
pub struct FailureRow {
    pub url: String,
    /// Empty when the harvester got no response.
    pub status: String,
    pub message: String,
    pub shacl_status: String,
    pub shacl_message: String,
}

impl From<&UrlCrawlError> for FailureRow {
    fn from(failure: &UrlCrawlError) -> Self {
        Self {
            url: failure.url.clone(),
            status: failure.status_display(),
            message: failure.message.clone(),
            shacl_status: failure.shacl_status.to_string(),
            shacl_message: failure.shacl_error_message.clone(),
        }
    }
}

/// One row of the warning table.
pub struct WarningRow {
    pub url: String,
    pub shacl_status: String,
    pub message: String,
}

impl From<&ShaclInfo> for WarningRow {
    fn from(info: &ShaclInfo) -> Self {
        Self {
            url: info.url.clone(),
            shacl_status: info.shacl_status.to_string(),
            message: info.shacl_validation_message.clone(),
        }
    }
}

pub struct WarningView {
    pub total: usize,
    pub note: String,
    pub rows: Vec<WarningRow>,
}

impl From<&WarningReport> for WarningView {
    fn from(report: &WarningReport) -> Self {
        Self {
            total: report.total_shacl_failures,
            note: report.sample_note(),
            rows: report.shacl_warnings.iter().map(WarningRow::from).collect(),
        }
    }
}

/// Everything shown for one loaded sitemap report.
pub struct ReportView {
    pub name: String,
    pub last_modified: String,
    pub sites_harvested: u64,
    pub sites_in_sitemap: u64,
    pub duration: String,
    pub source_link: Option<String>,
    pub successful_urls: Vec<String>,
    pub failures: Vec<FailureRow>,
    pub warnings: Option<WarningView>,
}

impl From<&SitemapCrawlStats> for ReportView {
    fn from(stats: &SitemapCrawlStats) -> Self {
        Self {
            name: stats.sitemap_name.clone(),
            last_modified: stats.last_modified_date().to_string(),
            sites_harvested: stats.sites_harvested,
            sites_in_sitemap: stats.sites_in_sitemap,
            duration: stats.duration_display(),
            source_link: stats.sitemap_source_link.clone().filter(|s| !s.is_empty()),
            successful_urls: stats.successful_urls.clone(),
            failures: stats.failures().iter().map(FailureRow::from).collect(),
            warnings: stats.warnings().map(WarningView::from),
        }
    }
}

/// One card on the dashboard: a placeholder, an error, or a report.
pub struct ItemCard {
    pub key: String,
    pub loading: bool,
    pub error: Option<String>,
    pub report: Option<ReportView>,
}

impl From<&SitemapItemState> for ItemCard {
    fn from(item: &SitemapItemState) -> Self {
        let (loading, error, report) = match item.status() {
            ItemStatus::Loading => (true, None, None),
            ItemStatus::Failed(e) => (false, Some(e.clone()), None),
            ItemStatus::Loaded(stats) => (false, None, Some(ReportView::from(stats.as_ref()))),
        };
        Self {
            key: item.key().to_string(),
            loading,
            error,
            report,
        }
    }
}

/// "Page X of Y", or "Page X" while the total is unknown. `page` is 0-based.
pub fn page_label(page: usize, total_pages: Option<usize>) -> String {
    let number = page.saturating_add(1);
    match total_pages {
        Some(total) => format!("Page {} of {}", number, total.max(number)),
        None => format!("Page {}", number),
    }
}

/// Sitemap index summary, once both figures are known.
pub fn index_summary(reports: Option<usize>, sitemaps_in_index: Option<usize>) -> Option<String> {
    match (reports, sitemaps_in_index) {
        (Some(shown), Some(total)) => Some(format!(
            "Showing reports for {} sitemaps out of {} in total",
            shown, total
        )),
        _ => None,
    }
}

/// Cards for every item on a page, in listing order.
pub fn cards(snapshot: &PageSnapshot) -> Vec<ItemCard> {
    snapshot.items.iter().map(ItemCard::from).collect()
}

//! Data models for crawl status reports.

mod item;
mod report;

pub use item::{ItemStatus, SitemapItemState};
pub use report::{ShaclInfo, ShaclStatus, SitemapCrawlStats, UrlCrawlError, WarningReport};

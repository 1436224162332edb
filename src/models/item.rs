//! Per-object loading state shown while a page of reports resolves.

use serde::Serialize;

use super::SitemapCrawlStats;

/// Where a single report object is in its lifecycle.
///
/// An item starts `Loading` and moves exactly once to either `Loaded` or
/// `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    Loading,
    Loaded(Box<SitemapCrawlStats>),
    Failed(String),
}

/// State of one report object, keyed by its object name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "ItemRecord")]
pub struct SitemapItemState {
    key: String,
    status: ItemStatus,
}

impl SitemapItemState {
    /// Placeholder for a freshly discovered key.
    pub fn pending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: ItemStatus::Loading,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn status(&self) -> &ItemStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, ItemStatus::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ItemStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&SitemapCrawlStats> {
        match &self.status {
            ItemStatus::Loaded(stats) => Some(stats),
            _ => None,
        }
    }

    /// Move a loading item to its terminal state.
    ///
    /// Returns false and leaves the item untouched if it already resolved.
    pub fn resolve(&mut self, outcome: Result<SitemapCrawlStats, String>) -> bool {
        if !self.is_loading() {
            return false;
        }
        self.status = match outcome {
            Ok(stats) => ItemStatus::Loaded(Box::new(stats)),
            Err(e) => ItemStatus::Failed(e),
        };
        true
    }
}

/// Wire shape: `{key, loading, error?, data?}`.
#[derive(Serialize)]
struct ItemRecord {
    key: String,
    loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<SitemapCrawlStats>,
}

impl From<SitemapItemState> for ItemRecord {
    fn from(item: SitemapItemState) -> Self {
        let (loading, error, data) = match item.status {
            ItemStatus::Loading => (true, None, None),
            ItemStatus::Loaded(stats) => (false, None, Some(*stats)),
            ItemStatus::Failed(e) => (false, Some(e), None),
        };
        Self {
            key: item.key,
            loading,
            error,
            data,
        }
    }
}

//! Paged listing and concurrent fetching of report objects.

use std::sync::Arc;

use chrono::SecondsFormat;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, warn};

use super::cancel::CancelToken;
use super::state::{PageItems, SharedItems};
use crate::models::SitemapCrawlStats;
use crate::storage::{ObjectEntry, ReportStore, StorageError};

/// Objects requested per listing page.
pub const PAGE_SIZE: usize = 10;

/// Objects requested per call while counting.
pub const COUNT_PAGE_SIZE: usize = 1000;

/// Timestamp used when neither the object nor the listing has one.
pub const UNKNOWN_TIMESTAMP: &str = "Unknown";

/// Why a single report could not be loaded.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Empty body")]
    EmptyBody,

    #[error("invalid report JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Report keys of one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListedPage {
    /// `.json` entries only, in listing order.
    pub entries: Vec<ObjectEntry>,
    pub next_token: Option<String>,
}

impl ListedPage {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }
}

/// How a page load ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLoad {
    Complete { next_token: Option<String> },
    Cancelled,
}

/// Lists and fetches reports under one prefix.
#[derive(Clone)]
pub struct ReportPager {
    store: Arc<dyn ReportStore>,
    prefix: String,
    page_size: usize,
}

impl ReportPager {
    pub fn new(store: Arc<dyn ReportStore>, prefix: &str) -> Self {
        Self {
            store,
            prefix: prefix.to_string(),
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    /// List one page, keeping only report keys.
    pub async fn list_page(&self, token: Option<&str>) -> Result<ListedPage, StorageError> {
        let page = self.store.list(&self.prefix, self.page_size, token).await?;
        let total = page.entries.len();
        let entries: Vec<_> = page.entries.into_iter().filter(|e| e.is_report()).collect();
        debug!(
            "Listed {} objects ({} reports) under {}",
            total,
            entries.len(),
            self.prefix
        );
        Ok(ListedPage {
            entries,
            next_token: page.next_token,
        })
    }

    /// Fetch and parse one report, stamping its last-modified time.
    pub async fn fetch_one(&self, entry: &ObjectEntry) -> Result<SitemapCrawlStats, FetchError> {
        let object = self.store.fetch(&entry.key).await?;
        if object.body.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(FetchError::EmptyBody);
        }

        let mut stats: SitemapCrawlStats = serde_json::from_slice(&object.body)?;
        stats.last_modified = Some(
            object
                .last_modified
                .or(entry.updated)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_else(|| UNKNOWN_TIMESTAMP.to_string()),
        );
        Ok(stats)
    }

    /// Load one page into `items`.
    ///
    /// A listing failure returns an error and leaves `items` untouched.
    /// Otherwise every report key gets a loading placeholder before any
    /// fetch starts, all fetches run concurrently, and each outcome is
    /// written to its own key as soon as it arrives.
    pub async fn load_page(
        &self,
        token: Option<&str>,
        items: &SharedItems,
        cancel: &CancelToken,
    ) -> Result<PageLoad, StorageError> {
        let listed = self.list_page(token).await?;

        // Re-checked under the lock; unmount may land while we wait for it
        {
            let mut guard = items.write().await;
            if cancel.is_cancelled() {
                return Ok(PageLoad::Cancelled);
            }
            *guard = PageItems::with_placeholders(listed.keys());
        }

        let fetches = listed.entries.iter().map(|entry| async move {
            let outcome = self.fetch_one(entry).await;
            if cancel.is_cancelled() {
                return;
            }
            let outcome = outcome.map_err(|e| {
                warn!("Error loading {}: {}", entry.key, e);
                e.to_string()
            });

            let mut guard = items.write().await;
            if cancel.is_cancelled() {
                return;
            }
            guard.resolve(&entry.key, outcome);
        });
        join_all(fetches).await;

        if cancel.is_cancelled() {
            return Ok(PageLoad::Cancelled);
        }
        Ok(PageLoad::Complete {
            next_token: listed.next_token,
        })
    }

    /// Count every report under the prefix by walking all listing pages.
    ///
    /// Returns `None` if cancelled part way.
    pub async fn count_reports(&self, cancel: &CancelToken) -> Result<Option<usize>, StorageError> {
        let mut count = 0;
        let mut token: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let page = self
                .store
                .list(&self.prefix, COUNT_PAGE_SIZE, token.as_deref())
                .await?;
            count += page.entries.iter().filter(|e| e.is_report()).count();

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!("Counted {} reports under {}", count, self.prefix);
        Ok(Some(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};

    const PREFIX: &str = "metadata/sitemaps/";

    fn report(name: &str) -> String {
        format!(
            r#"{{"SitemapName": "{}", "SuccessfulUrls": [], "SecondsToComplete": 1.0,
                "SitesHarvested": 1, "SitesInSitemap": 1}}"#,
            name
        )
    }

    fn pager(store: MemoryStore) -> (Arc<MemoryStore>, ReportPager) {
        let store = Arc::new(store);
        let pager = ReportPager::new(store.clone(), PREFIX);
        (store, pager)
    }

    #[tokio::test]
    async fn test_list_page_ignores_non_json() {
        let (_, pager) = pager(
            MemoryStore::new()
                .with_object("metadata/sitemaps/a.json", report("a"))
                .with_object("metadata/sitemaps/b.txt", "not a report")
                .with_object("metadata/sitemaps/c.json", report("c")),
        );

        let page = pager.list_page(None).await.unwrap();
        let keys: Vec<_> = page.keys().collect();
        assert_eq!(keys, vec!["metadata/sitemaps/a.json", "metadata/sitemaps/c.json"]);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_fetch_one_stamps_listing_time() {
        let updated = Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap();
        let (_, pager) = pager(MemoryStore::new().with_object_at(
            "metadata/sitemaps/a.json",
            report("a"),
            updated,
        ));

        let entry = ObjectEntry {
            key: "metadata/sitemaps/a.json".to_string(),
            updated: Some(updated),
        };
        let stats = pager.fetch_one(&entry).await.unwrap();
        assert_eq!(stats.sitemap_name, "a");
        assert_eq!(stats.last_modified.as_deref(), Some("2025-02-03T04:05:06.000Z"));
    }

    #[tokio::test]
    async fn test_fetch_one_unknown_time() {
        let (_, pager) = pager(MemoryStore::new().with_object("metadata/sitemaps/a.json", report("a")));
        let stats = pager
            .fetch_one(&ObjectEntry::new("metadata/sitemaps/a.json"))
            .await
            .unwrap();
        assert_eq!(stats.last_modified.as_deref(), Some(UNKNOWN_TIMESTAMP));
    }

    #[tokio::test]
    async fn test_fetch_one_empty_body() {
        let (_, pager) = pager(MemoryStore::new().with_object("metadata/sitemaps/a.json", ""));
        let err = pager
            .fetch_one(&ObjectEntry::new("metadata/sitemaps/a.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::EmptyBody));
        assert_eq!(err.to_string(), "Empty body");
    }

    #[tokio::test]
    async fn test_fetch_one_bad_json() {
        let (_, pager) = pager(MemoryStore::new().with_object("metadata/sitemaps/a.json", "{"));
        let err = pager
            .fetch_one(&ObjectEntry::new("metadata/sitemaps/a.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_load_page_records_item_outcomes() {
        let (store, pager) = pager(
            MemoryStore::new()
                .with_object("metadata/sitemaps/a.json", report("a"))
                .with_object("metadata/sitemaps/b.json", report("b"))
                .with_object("metadata/sitemaps/c.json", "")
                .with_failing_fetch("metadata/sitemaps/b.json"),
        );
        let items = PageItems::default().shared();

        let outcome = pager
            .load_page(None, &items, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, PageLoad::Complete { next_token: None });
        assert_eq!(store.fetch_calls(), 3);

        let items = items.read().await;
        assert!(items.is_settled());

        let a = items.get("metadata/sitemaps/a.json").unwrap();
        assert!(a.data().is_some() && a.error().is_none());

        let b = items.get("metadata/sitemaps/b.json").unwrap();
        assert!(b.data().is_none());
        assert!(b.error().unwrap().contains("500"));

        let c = items.get("metadata/sitemaps/c.json").unwrap();
        assert_eq!(c.error(), Some("Empty body"));
    }

    #[tokio::test]
    async fn test_load_page_listing_failure_leaves_items_empty() {
        let (store, pager) = pager(
            MemoryStore::new()
                .with_object("metadata/sitemaps/a.json", report("a"))
                .with_listing_error(503),
        );
        let items = PageItems::default().shared();

        let result = pager.load_page(None, &items, &CancelToken::new()).await;
        assert!(matches!(result, Err(StorageError::Status { status: 503, .. })));
        assert!(items.read().await.is_empty());
        assert_eq!(store.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_load_page_follows_token() {
        let mut store = MemoryStore::new();
        for i in 0..5 {
            store = store.with_object(&format!("metadata/sitemaps/{}.json", i), report(&i.to_string()));
        }
        let (_, pager) = pager(store);
        let pager = pager.with_page_size(2);
        let items = PageItems::default().shared();
        let cancel = CancelToken::new();

        let first = pager.load_page(None, &items, &cancel).await.unwrap();
        let PageLoad::Complete { next_token } = first else {
            panic!("page should complete");
        };
        assert_eq!(items.read().await.len(), 2);

        let items = PageItems::default().shared();
        pager
            .load_page(next_token.as_deref(), &items, &cancel)
            .await
            .unwrap();
        let keys: Vec<_> = items.read().await.iter().map(|i| i.key().to_string()).collect();
        assert_eq!(keys, vec!["metadata/sitemaps/2.json", "metadata/sitemaps/3.json"]);
    }

    #[tokio::test]
    async fn test_cancelled_load_does_not_touch_items() {
        let (_, pager) = pager(MemoryStore::new().with_object("metadata/sitemaps/a.json", report("a")));
        let items = PageItems::default().shared();
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = pager.load_page(None, &items, &cancel).await.unwrap();
        assert_eq!(outcome, PageLoad::Cancelled);
        assert!(items.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_write_lock() {
        let (store, pager) = pager(
            MemoryStore::gated().with_object("metadata/sitemaps/a.json", report("a")),
        );
        let items = PageItems::default().shared();
        let cancel = CancelToken::new();

        let task = {
            let (pager, items, cancel) = (pager.clone(), Arc::clone(&items), cancel.clone());
            tokio::spawn(async move { pager.load_page(None, &items, &cancel).await })
        };
        while items.read().await.is_empty() {
            tokio::task::yield_now().await;
        }

        // The fetch finishes while the lock is held, then the token is set
        let guard = items.write().await;
        store.release_fetches(1);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel.cancel();
        drop(guard);

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, PageLoad::Cancelled);
        let items = items.read().await;
        assert_eq!(items.pending(), 1);
        assert!(items.reports().next().is_none());
    }

    #[tokio::test]
    async fn test_count_reports_walks_all_pages() {
        let store = MemoryStore::new();
        for i in 0..2500 {
            store.insert(&format!("metadata/sitemaps/{:04}.json", i), b"{}".to_vec(), None);
        }
        store.insert("metadata/sitemaps/notes.txt", b"x".to_vec(), None);
        let (store, pager) = pager(store);

        let count = pager.count_reports(&CancelToken::new()).await.unwrap();
        assert_eq!(count, Some(2500));
        assert_eq!(store.list_calls(), 3);
    }
}

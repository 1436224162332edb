//! Paginated dashboard over the report bucket.
//!
//! A mounted dashboard starts three independent pieces of work: the first
//! page load, a full count of reports, and (when configured) the sitemap
//! index probe. Pages are cached by index for the dashboard's lifetime so
//! moving back and forth never refetches a page that loaded. Unmounting
//! cancels everything still in flight and no later result is recorded.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::cancel::CancelToken;
use super::pager::{PageLoad, ReportPager};
use super::state::{PageItems, SharedItems};
use crate::models::{SitemapCrawlStats, SitemapItemState};
use crate::sitemap_index::SitemapIndexProbe;

/// What the dashboard is doing from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Counting reports and nothing has been shown yet.
    Counting,
    LoadingPage,
    PageReady,
}

/// Progress of the report count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum TotalCount {
    Counting,
    Known(usize),
    Unavailable,
}

impl TotalCount {
    pub fn known(&self) -> Option<usize> {
        match self {
            Self::Known(n) => Some(*n),
            _ => None,
        }
    }
}

/// Listing state of one cached page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Loading,
    Ready { next_token: Option<String> },
    Failed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("page {0} is not reachable yet")]
    Unreachable(usize),

    #[error("already on the first page")]
    AtFirstPage,

    #[error("dashboard has been unmounted")]
    Unmounted,
}

struct CachedPage {
    items: SharedItems,
    status: Arc<watch::Sender<PageStatus>>,
}

/// Point-in-time view of one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot {
    pub page: usize,
    pub phase: Phase,
    pub loading: bool,
    /// Listing error for the page, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub items: Vec<SitemapItemState>,
    pub has_prev: bool,
    pub has_next: bool,
    pub total_reports: TotalCount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemaps_in_index: Option<usize>,
}

impl PageSnapshot {
    /// Items that finished loading successfully.
    pub fn loaded(&self) -> usize {
        self.items.iter().filter(|i| i.data().is_some()).count()
    }

    pub fn pending(&self) -> usize {
        self.items.iter().filter(|i| i.is_loading()).count()
    }
}

/// Dashboard-wide status.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStatus {
    pub phase: Phase,
    pub current_page: usize,
    pub cached_pages: Vec<usize>,
    pub total_reports: TotalCount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemaps_in_index: Option<usize>,
    pub unmounted: bool,
}

pub struct Dashboard {
    pager: ReportPager,
    cancel: CancelToken,
    pages: Mutex<BTreeMap<usize, CachedPage>>,
    current: AtomicUsize,
    total: watch::Sender<TotalCount>,
    sitemaps_in_index: watch::Sender<Option<usize>>,
}

impl Dashboard {
    /// Create a dashboard and start loading.
    ///
    /// Must be called inside a tokio runtime.
    pub fn mount(pager: ReportPager, probe: Option<SitemapIndexProbe>) -> Arc<Self> {
        let dashboard = Arc::new(Self {
            pager,
            cancel: CancelToken::new(),
            pages: Mutex::new(BTreeMap::new()),
            current: AtomicUsize::new(0),
            total: watch::Sender::new(TotalCount::Counting),
            sitemaps_in_index: watch::Sender::new(None),
        });

        tokio::spawn(Arc::clone(&dashboard).count_reports());
        if let Some(probe) = probe {
            tokio::spawn(Arc::clone(&dashboard).probe_index(probe));
        }
        if let Err(e) = dashboard.navigate(0) {
            warn!("Initial page load not started: {}", e);
        }

        dashboard
    }

    /// Cancel all in-flight work. Idempotent.
    pub fn unmount(&self) {
        if !self.cancel.is_cancelled() {
            info!("Dashboard unmounted, cancelling in-flight loads");
        }
        self.cancel.cancel();
    }

    pub fn is_unmounted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn current_page(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn total_reports(&self) -> TotalCount {
        *self.total.borrow()
    }

    pub fn sitemaps_in_index(&self) -> Option<usize> {
        *self.sitemaps_in_index.borrow()
    }

    /// Make `page` current, loading it unless it is already cached.
    ///
    /// Page 0 is always reachable. Page N is reachable once page N-1 has
    /// loaded and its listing returned a continuation token. A page whose
    /// listing failed is listed again.
    pub fn navigate(self: &Arc<Self>, page: usize) -> Result<(), NavigationError> {
        if self.cancel.is_cancelled() {
            return Err(NavigationError::Unmounted);
        }

        let (items, status, token) = {
            let mut pages = self.pages.lock().map_err(|_| NavigationError::Unmounted)?;

            if let Some(cached) = pages.get(&page) {
                if !matches!(*cached.status.borrow(), PageStatus::Failed(_)) {
                    debug!("Page {} served from cache", page);
                    self.current.store(page, Ordering::SeqCst);
                    return Ok(());
                }
            }

            let token = if page == 0 {
                None
            } else {
                let next_token = pages.get(&(page - 1)).and_then(|previous| {
                    match &*previous.status.borrow() {
                        PageStatus::Ready { next_token } => next_token.clone(),
                        _ => None,
                    }
                });
                Some(next_token.ok_or(NavigationError::Unreachable(page))?)
            };

            let cached = CachedPage {
                items: PageItems::default().shared(),
                status: Arc::new(watch::Sender::new(PageStatus::Loading)),
            };
            let handles = (Arc::clone(&cached.items), Arc::clone(&cached.status));
            pages.insert(page, cached);
            (handles.0, handles.1, token)
        };

        self.current.store(page, Ordering::SeqCst);
        debug!("Loading page {}", page);
        tokio::spawn(Arc::clone(self).load_page(page, token, items, status));
        Ok(())
    }

    /// Show `page`, loading it only if it was never requested.
    ///
    /// Unlike [`Dashboard::navigate`], a cached page whose listing failed
    /// keeps its error instead of being listed again.
    pub fn visit(self: &Arc<Self>, page: usize) -> Result<(), NavigationError> {
        let cached = self
            .pages
            .lock()
            .map(|pages| pages.contains_key(&page))
            .unwrap_or(false);
        if cached && !self.cancel.is_cancelled() {
            self.current.store(page, Ordering::SeqCst);
            return Ok(());
        }
        self.navigate(page)
    }

    /// Move to the following page. Returns the new page index.
    pub fn next(self: &Arc<Self>) -> Result<usize, NavigationError> {
        let page = self.current_page() + 1;
        self.navigate(page)?;
        Ok(page)
    }

    /// Move to the preceding page. Returns the new page index.
    pub fn prev(self: &Arc<Self>) -> Result<usize, NavigationError> {
        let page = self
            .current_page()
            .checked_sub(1)
            .ok_or(NavigationError::AtFirstPage)?;
        self.navigate(page)?;
        Ok(page)
    }

    fn cached(&self, page: usize) -> Option<(SharedItems, PageStatus)> {
        let pages = self.pages.lock().ok()?;
        let cached = pages.get(&page)?;
        let status = cached.status.borrow().clone();
        Some((Arc::clone(&cached.items), status))
    }

    fn phase_for(&self, status: Option<&PageStatus>) -> Phase {
        let counting = self.total_reports() == TotalCount::Counting;
        match status {
            Some(PageStatus::Loading) | None if counting && !self.any_page_ready() => {
                Phase::Counting
            }
            Some(PageStatus::Loading) | None => Phase::LoadingPage,
            Some(_) => Phase::PageReady,
        }
    }

    fn any_page_ready(&self) -> bool {
        self.pages
            .lock()
            .map(|pages| {
                pages
                    .values()
                    .any(|c| !matches!(*c.status.borrow(), PageStatus::Loading))
            })
            .unwrap_or(false)
    }

    /// Dashboard phase as seen on the current page.
    pub fn phase(&self) -> Phase {
        let status = self.cached(self.current_page()).map(|(_, s)| s);
        self.phase_for(status.as_ref())
    }

    /// Snapshot of a cached page, `None` if it was never requested.
    pub async fn snapshot(&self, page: usize) -> Option<PageSnapshot> {
        let (items, status) = self.cached(page)?;
        let items: Vec<SitemapItemState> = items.read().await.iter().cloned().collect();
        let total_reports = self.total_reports();

        let total_pages = total_reports
            .known()
            .map(|n| n.div_ceil(self.pager.page_size()).max(1));

        Some(PageSnapshot {
            page,
            phase: self.phase_for(Some(&status)),
            loading: matches!(status, PageStatus::Loading),
            error: match &status {
                PageStatus::Failed(e) => Some(e.clone()),
                _ => None,
            },
            has_prev: page > 0,
            has_next: matches!(
                status,
                PageStatus::Ready {
                    next_token: Some(_)
                }
            ),
            items,
            total_reports,
            total_pages,
            sitemaps_in_index: self.sitemaps_in_index(),
        })
    }

    pub async fn current_snapshot(&self) -> Option<PageSnapshot> {
        self.snapshot(self.current_page()).await
    }

    pub fn status(&self) -> DashboardStatus {
        let cached_pages = self
            .pages
            .lock()
            .map(|pages| pages.keys().copied().collect())
            .unwrap_or_default();
        DashboardStatus {
            phase: self.phase(),
            current_page: self.current_page(),
            cached_pages,
            total_reports: self.total_reports(),
            sitemaps_in_index: self.sitemaps_in_index(),
            unmounted: self.is_unmounted(),
        }
    }

    /// Every loaded report across cached pages, by page then listing order.
    pub async fn all_reports(&self) -> Vec<SitemapCrawlStats> {
        let pages: Vec<SharedItems> = match self.pages.lock() {
            Ok(pages) => pages.values().map(|c| Arc::clone(&c.items)).collect(),
            Err(_) => return Vec::new(),
        };

        let mut reports = Vec::new();
        for items in pages {
            reports.extend(items.read().await.reports().cloned());
        }
        reports
    }

    /// Wait until `page` finishes listing and every item settles.
    ///
    /// Returns the final listing status. Items resolve before the status
    /// flips, so a `Ready` page has no loading items left.
    pub async fn wait_for_page(&self, page: usize) -> Result<PageStatus, NavigationError> {
        let mut rx = {
            let pages = self.pages.lock().map_err(|_| NavigationError::Unmounted)?;
            let cached = pages.get(&page).ok_or(NavigationError::Unreachable(page))?;
            cached.status.subscribe()
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Err(NavigationError::Unmounted),
            status = rx.wait_for(|s| *s != PageStatus::Loading) => {
                status.map(|s| (*s).clone()).map_err(|_| NavigationError::Unmounted)
            }
        }
    }

    /// Wait for the report count to finish.
    pub async fn wait_for_total(&self) -> TotalCount {
        let mut rx = self.total.subscribe();
        tokio::select! {
            _ = self.cancel.cancelled() => self.total_reports(),
            total = rx.wait_for(|t| *t != TotalCount::Counting) => {
                total.map(|t| *t).unwrap_or(TotalCount::Unavailable)
            }
        }
    }

    async fn load_page(
        self: Arc<Self>,
        page: usize,
        token: Option<String>,
        items: SharedItems,
        status: Arc<watch::Sender<PageStatus>>,
    ) {
        let result = self
            .pager
            .load_page(token.as_deref(), &items, &self.cancel)
            .await;
        if self.cancel.is_cancelled() {
            return;
        }

        match result {
            Ok(PageLoad::Complete { next_token }) => {
                debug!("Page {} loaded (more: {})", page, next_token.is_some());
                publish(&self.cancel, &*status, PageStatus::Ready { next_token });
            }
            Ok(PageLoad::Cancelled) => {}
            Err(e) => {
                error!("Error fetching page {}: {}", page, e);
                publish(&self.cancel, &*status, PageStatus::Failed(format!(
                    "Error loading report from {}: {}",
                    self.pager.store().describe(),
                    e
                )));
            }
        }
    }

    async fn count_reports(self: Arc<Self>) {
        let result = self.pager.count_reports(&self.cancel).await;
        if self.cancel.is_cancelled() {
            return;
        }

        match result {
            Ok(Some(count)) => {
                info!("Found {} crawl reports", count);
                publish(&self.cancel, &self.total, TotalCount::Known(count));
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Error counting reports: {}", e);
                publish(&self.cancel, &self.total, TotalCount::Unavailable);
            }
        }
    }

    async fn probe_index(self: Arc<Self>, probe: SitemapIndexProbe) {
        let result = probe.run(&self.cancel).await;
        if self.cancel.is_cancelled() {
            return;
        }

        match result {
            Ok(Some(count)) => {
                debug!("Sitemap index lists {} sitemaps", count);
                publish(&self.cancel, &self.sitemaps_in_index, Some(count));
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Error fetching sitemap index {}: {}", probe.url(), e);
                publish(&self.cancel, &self.sitemaps_in_index, None);
            }
        }
    }
}

/// Replace a channel value unless the dashboard was unmounted. The token is
/// read while the channel is locked.
fn publish<T>(cancel: &CancelToken, tx: &watch::Sender<T>, value: T) -> bool {
    tx.send_if_modified(|current| {
        if cancel.is_cancelled() {
            return false;
        }
        *current = value;
        true
    })
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::time::Duration;

    const PREFIX: &str = "metadata/sitemaps/";

    fn report(name: &str) -> String {
        format!(r#"{{"SitemapName": "{}", "SuccessfulUrls": ["https://example.com/{}"]}}"#, name, name)
    }

    fn store_with(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            let name = format!("s{:02}", i);
            store.insert(&format!("{}{}.json", PREFIX, name), report(&name).into_bytes(), None);
        }
        store
    }

    fn mount(store: Arc<MemoryStore>, page_size: usize) -> Arc<Dashboard> {
        let pager = ReportPager::new(store, PREFIX).with_page_size(page_size);
        Dashboard::mount(pager, None)
    }

    async fn settle(dashboard: &Dashboard, page: usize) -> PageStatus {
        tokio::time::timeout(Duration::from_secs(5), dashboard.wait_for_page(page))
            .await
            .expect("page should settle")
            .unwrap()
    }

    #[tokio::test]
    async fn test_mount_loads_first_page_and_counts() {
        let store = Arc::new(store_with(25));
        let dashboard = mount(store, 10);

        assert_eq!(
            settle(&dashboard, 0).await,
            PageStatus::Ready {
                next_token: Some("10".to_string())
            }
        );
        assert_eq!(dashboard.wait_for_total().await, TotalCount::Known(25));

        let snapshot = dashboard.snapshot(0).await.unwrap();
        assert_eq!(snapshot.items.len(), 10);
        assert_eq!(snapshot.loaded(), 10);
        assert_eq!(snapshot.phase, Phase::PageReady);
        assert!(snapshot.has_next);
        assert!(!snapshot.has_prev);
        assert_eq!(snapshot.total_pages, Some(3));
    }

    #[tokio::test]
    async fn test_next_requires_loaded_previous_page() {
        let store = Arc::new(MemoryStore::gated());
        for i in 0..15 {
            store.insert(&format!("{}{:02}.json", PREFIX, i), report("x").into_bytes(), None);
        }
        let dashboard = mount(store.clone(), 10);

        assert_eq!(dashboard.navigate(1), Err(NavigationError::Unreachable(1)));
        assert_eq!(dashboard.navigate(5), Err(NavigationError::Unreachable(5)));

        store.release_fetches(100);
        settle(&dashboard, 0).await;
        assert_eq!(dashboard.next(), Ok(1));
        assert_eq!(settle(&dashboard, 1).await, PageStatus::Ready { next_token: None });

        let snapshot = dashboard.snapshot(1).await.unwrap();
        assert_eq!(snapshot.items.len(), 5);
        assert!(!snapshot.has_next);
        assert_eq!(dashboard.next(), Err(NavigationError::Unreachable(2)));
    }

    #[tokio::test]
    async fn test_cached_pages_are_not_refetched() {
        let store = Arc::new(store_with(15));
        let dashboard = mount(store.clone(), 10);
        dashboard.wait_for_total().await;
        settle(&dashboard, 0).await;

        dashboard.next().unwrap();
        settle(&dashboard, 1).await;
        let lists = store.list_calls();
        let fetches = store.fetch_calls();
        assert_eq!(fetches, 15);

        assert_eq!(dashboard.prev(), Ok(0));
        assert_eq!(dashboard.next(), Ok(1));
        assert_eq!(dashboard.prev(), Ok(0));
        assert_eq!(dashboard.prev(), Err(NavigationError::AtFirstPage));

        assert_eq!(store.list_calls(), lists);
        assert_eq!(store.fetch_calls(), fetches);
        assert_eq!(dashboard.status().cached_pages, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_items_stay_loading_until_released() {
        let store = Arc::new(MemoryStore::gated());
        for i in 0..3 {
            store.insert(&format!("{}{}.json", PREFIX, i), report("x").into_bytes(), None);
        }
        let dashboard = mount(store.clone(), 10);

        // Wait for the placeholders to appear
        let mut snapshot = dashboard.snapshot(0).await.unwrap();
        for _ in 0..100 {
            if snapshot.items.len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            snapshot = dashboard.snapshot(0).await.unwrap();
        }
        assert_eq!(snapshot.items.len(), 3);
        assert!(snapshot.loading);
        assert_eq!(snapshot.pending(), 3);
        assert_ne!(snapshot.phase, Phase::PageReady);

        store.release_fetches(3);
        settle(&dashboard, 0).await;
        assert_eq!(dashboard.snapshot(0).await.unwrap().loaded(), 3);
    }

    #[tokio::test]
    async fn test_listing_failure_is_page_error() {
        let store = Arc::new(store_with(3).with_listing_error(500));
        let dashboard = mount(store.clone(), 10);

        let status = settle(&dashboard, 0).await;
        let PageStatus::Failed(message) = status else {
            panic!("listing should fail");
        };
        assert!(message.starts_with("Error loading report from memory://reports"));
        assert_eq!(dashboard.wait_for_total().await, TotalCount::Unavailable);

        let snapshot = dashboard.snapshot(0).await.unwrap();
        assert!(snapshot.error.is_some());
        assert!(snapshot.items.is_empty());
        assert_eq!(store.fetch_calls(), 0);

        // Visiting keeps the error, navigating lists the page again
        let lists = store.list_calls();
        dashboard.visit(0).unwrap();
        assert_eq!(store.list_calls(), lists);
        dashboard.navigate(0).unwrap();
        settle(&dashboard, 0).await;
        assert!(store.list_calls() > lists);
    }

    #[tokio::test]
    async fn test_item_failures_do_not_fail_page() {
        let store = Arc::new(
            store_with(3)
                .with_failing_fetch("metadata/sitemaps/s01.json")
                .with_object("metadata/sitemaps/s03.json", ""),
        );
        let dashboard = mount(store, 10);

        assert!(matches!(settle(&dashboard, 0).await, PageStatus::Ready { .. }));
        let snapshot = dashboard.snapshot(0).await.unwrap();
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.items.len(), 4);
        assert_eq!(snapshot.loaded(), 2);
        assert_eq!(snapshot.items[3].error(), Some("Empty body"));
        assert!(snapshot.items[1].error().is_some());
    }

    #[tokio::test]
    async fn test_unmount_discards_late_results() {
        let store = Arc::new(MemoryStore::gated());
        store.insert("metadata/sitemaps/a.json", report("a").into_bytes(), None);
        let dashboard = mount(store.clone(), 10);

        // Let the listing write placeholders, then unmount mid-fetch
        for _ in 0..100 {
            if store.fetch_calls() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        dashboard.unmount();
        store.release_fetches(1);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let snapshot = dashboard.snapshot(0).await.unwrap();
        assert!(snapshot.items.iter().all(|i| i.is_loading()));
        assert!(dashboard.is_unmounted());
        assert_eq!(dashboard.navigate(0), Err(NavigationError::Unmounted));
        assert!(matches!(
            dashboard.wait_for_page(0).await,
            Err(NavigationError::Unmounted)
        ));
    }

    #[tokio::test]
    async fn test_all_reports_spans_cached_pages() {
        let store = Arc::new(store_with(12));
        let dashboard = mount(store, 5);
        settle(&dashboard, 0).await;
        dashboard.next().unwrap();
        settle(&dashboard, 1).await;

        let names: Vec<_> = dashboard
            .all_reports()
            .await
            .into_iter()
            .map(|r| r.sitemap_name)
            .collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "s00");
        assert_eq!(names[9], "s09");
    }

    #[test]
    fn test_publish_skips_after_unmount() {
        let cancel = CancelToken::new();
        let tx = watch::Sender::new(TotalCount::Counting);

        assert!(publish(&cancel, &tx, TotalCount::Known(3)));
        assert_eq!(*tx.borrow(), TotalCount::Known(3));

        cancel.cancel();
        assert!(!publish(&cancel, &tx, TotalCount::Unavailable));
        assert_eq!(*tx.borrow(), TotalCount::Known(3));
    }
}

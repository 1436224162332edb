//! Per-page item state, keyed by object name.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::{SitemapCrawlStats, SitemapItemState};

/// Items of one page, shared between the fetch tasks and readers.
pub type SharedItems = Arc<RwLock<PageItems>>;

/// Items of one listing page.
///
/// Iteration follows listing order regardless of the order fetches
/// complete in.
#[derive(Debug, Clone, Default)]
pub struct PageItems {
    order: Vec<String>,
    items: HashMap<String, SitemapItemState>,
}

impl PageItems {
    /// One loading placeholder per key, in the given order.
    pub fn with_placeholders<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut page = Self::default();
        for key in keys {
            let key = key.into();
            if page.items.contains_key(&key) {
                continue;
            }
            page.items
                .insert(key.clone(), SitemapItemState::pending(key.clone()));
            page.order.push(key);
        }
        page
    }

    pub fn shared(self) -> SharedItems {
        Arc::new(RwLock::new(self))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&SitemapItemState> {
        self.items.get(key)
    }

    /// Record the outcome for `key`.
    ///
    /// Only that key's entry changes. Returns false for unknown keys and
    /// for items that already resolved.
    pub fn resolve(&mut self, key: &str, outcome: Result<SitemapCrawlStats, String>) -> bool {
        match self.items.get_mut(key) {
            Some(item) => item.resolve(outcome),
            None => false,
        }
    }

    /// Items in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &SitemapItemState> {
        self.order.iter().filter_map(|key| self.items.get(key))
    }

    pub fn pending(&self) -> usize {
        self.iter().filter(|item| item.is_loading()).count()
    }

    /// Whether every item reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.pending() == 0
    }

    /// Loaded reports in listing order.
    pub fn reports(&self) -> impl Iterator<Item = &SitemapCrawlStats> {
        self.iter().filter_map(|item| item.data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(name: &str) -> SitemapCrawlStats {
        SitemapCrawlStats {
            sitemap_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_placeholders_all_loading() {
        let page = PageItems::with_placeholders(["a.json", "c.json", "a.json"]);
        assert_eq!(page.len(), 2);
        assert!(page.iter().all(|item| item.is_loading()));
        assert_eq!(page.pending(), 2);
        assert!(!page.is_settled());
    }

    #[test]
    fn test_out_of_order_resolution_keeps_listing_order() {
        let mut page = PageItems::with_placeholders(["a.json", "b.json", "c.json"]);

        assert!(page.resolve("c.json", Ok(stats("c"))));
        assert!(page.resolve("a.json", Err("boom".to_string())));

        let keys: Vec<_> = page.iter().map(|i| i.key()).collect();
        assert_eq!(keys, vec!["a.json", "b.json", "c.json"]);
        assert!(page.get("b.json").unwrap().is_loading());
        assert_eq!(page.get("a.json").unwrap().error(), Some("boom"));
        assert_eq!(page.reports().count(), 1);

        assert!(page.resolve("b.json", Ok(stats("b"))));
        assert!(page.is_settled());
        let names: Vec<_> = page.reports().map(|r| r.sitemap_name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_unknown_and_repeated_keys_ignored() {
        let mut page = PageItems::with_placeholders(["a.json"]);
        assert!(!page.resolve("zzz.json", Ok(stats("z"))));
        assert!(page.resolve("a.json", Ok(stats("a"))));
        assert!(!page.resolve("a.json", Err("late".to_string())));
        assert!(page.get("a.json").unwrap().error().is_none());
        assert!(page.get("zzz.json").is_none());
    }
}

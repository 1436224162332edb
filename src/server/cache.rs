//! Rendered export documents, reused while the loaded report set is unchanged.
//!
//! Exports are recomputed from every loaded report. A fingerprint of the
//! serialized reports decides whether the last rendering still applies.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use crate::jsonld;
use crate::models::SitemapCrawlStats;

struct CacheEntry {
    fingerprint: u64,
    body: Arc<String>,
}

/// Cache for the JSON and JSON-LD exports.
pub struct ExportCache {
    json: RwLock<Option<CacheEntry>>,
    jsonld: RwLock<Option<CacheEntry>>,
}

impl ExportCache {
    pub fn new() -> Self {
        Self {
            json: RwLock::new(None),
            jsonld: RwLock::new(None),
        }
    }

    /// Identify a report set by its serialized content.
    pub fn fingerprint(reports: &[SitemapCrawlStats]) -> u64 {
        let mut hasher = DefaultHasher::new();
        match serde_json::to_vec(reports) {
            Ok(bytes) => bytes.hash(&mut hasher),
            Err(_) => reports.len().hash(&mut hasher),
        }
        hasher.finish()
    }

    /// Pretty JSON array of the reports.
    pub fn json(&self, reports: &[SitemapCrawlStats]) -> Arc<String> {
        Self::get_or_render(&self.json, reports, |reports| {
            serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string())
        })
    }

    /// Pretty JSON-LD document for the reports.
    pub fn jsonld(&self, reports: &[SitemapCrawlStats]) -> Arc<String> {
        Self::get_or_render(&self.jsonld, reports, |reports| {
            serde_json::to_string_pretty(&jsonld::compose(reports)).unwrap_or_default()
        })
    }

    fn get_or_render(
        slot: &RwLock<Option<CacheEntry>>,
        reports: &[SitemapCrawlStats],
        render: impl FnOnce(&[SitemapCrawlStats]) -> String,
    ) -> Arc<String> {
        let fingerprint = Self::fingerprint(reports);

        let cached = slot.read().ok().and_then(|guard| {
            guard
                .as_ref()
                .filter(|entry| entry.fingerprint == fingerprint)
                .map(|entry| Arc::clone(&entry.body))
        });
        if let Some(body) = cached {
            return body;
        }

        let body = Arc::new(render(reports));
        if let Ok(mut guard) = slot.write() {
            *guard = Some(CacheEntry {
                fingerprint,
                body: Arc::clone(&body),
            });
        }
        body
    }
}

impl Default for ExportCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str) -> SitemapCrawlStats {
        SitemapCrawlStats {
            sitemap_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_reuses_rendering_until_set_changes() {
        let cache = ExportCache::new();
        let mut reports = vec![report("a")];

        let first = cache.jsonld(&reports);
        let again = cache.jsonld(&reports);
        assert!(Arc::ptr_eq(&first, &again));

        reports.push(report("b"));
        let grown = cache.jsonld(&reports);
        assert!(!Arc::ptr_eq(&first, &grown));
        assert!(grown.contains("http://geoconnex.us/sitemap/b"));
    }

    #[test]
    fn test_changed_report_of_same_shape_rerenders() {
        let cache = ExportCache::new();
        let mut reports = vec![report("a")];
        reports[0].sites_harvested = 1;
        let first = cache.json(&reports);

        reports[0].sites_harvested = 2;
        let second = cache.json(&reports);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.contains("\"SitesHarvested\": 2"));
    }

    #[test]
    fn test_json_and_jsonld_cached_separately() {
        let cache = ExportCache::new();
        let reports = vec![report("a")];
        let json = cache.json(&reports);
        let jsonld = cache.jsonld(&reports);
        assert!(json.trim_start().starts_with('['));
        assert!(jsonld.contains("@graph"));
    }
}

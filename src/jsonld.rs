//! JSON-LD export of crawl reports.
//!
//! The vocabulary document is embedded at build time and parsed once.
//! Each export clones it and fills `@graph` with one node per report.

use std::sync::LazyLock;

use serde_json::{Map, Value};

use crate::models::SitemapCrawlStats;

/// Base IRI for sitemap nodes; the sitemap name is appended.
pub const SITEMAP_ID_BASE: &str = "http://geoconnex.us/sitemap/";

pub const JSONLD_CONTENT_TYPE: &str = "application/ld+json";

const VOCAB_JSON: &str = include_str!("../assets/vocab.json");

static VOCAB: LazyLock<Value> =
    LazyLock::new(|| serde_json::from_str(VOCAB_JSON).expect("embedded vocab.json is valid JSON"));

/// The vocabulary template. Never modified.
pub fn vocab() -> &'static Value {
    &VOCAB
}

pub fn sitemap_id(name: &str) -> String {
    format!("{}{}", SITEMAP_ID_BASE, name)
}

/// One `@graph` node: the report's own fields plus its `@id`.
pub fn report_node(report: &SitemapCrawlStats) -> Value {
    let mut node = match serde_json::to_value(report) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    node.insert("@id".to_string(), Value::String(sitemap_id(&report.sitemap_name)));
    Value::Object(node)
}

/// Build a JSON-LD document for `reports`.
pub fn compose<'a, I>(reports: I) -> Value
where
    I: IntoIterator<Item = &'a SitemapCrawlStats>,
{
    let graph: Vec<Value> = reports.into_iter().map(report_node).collect();

    let mut document = match vocab().clone() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    document.insert("@graph".to_string(), Value::Array(graph));
    Value::Object(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UrlCrawlError, WarningReport};

    fn report(name: &str) -> SitemapCrawlStats {
        SitemapCrawlStats {
            sitemap_name: name.to_string(),
            successful_urls: vec![format!("https://example.com/{}", name)],
            seconds_to_complete: 1.5,
            sites_harvested: 1,
            sites_in_sitemap: 2,
            crawl_failures: Some(vec![UrlCrawlError {
                url: "https://example.com/bad".to_string(),
                status: 404,
                message: "not found".to_string(),
                ..Default::default()
            }]),
            warning_stats: Some(WarningReport::default()),
            last_modified: Some("2025-01-01T00:00:00.000Z".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_compose_graph() {
        let reports = vec![report("a"), report("b")];
        let doc = compose(&reports);

        assert_eq!(doc["@context"], vocab()["@context"]);
        let graph = doc["@graph"].as_array().unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph[0]["@id"], "http://geoconnex.us/sitemap/a");
        assert_eq!(graph[1]["@id"], "http://geoconnex.us/sitemap/b");
        assert_eq!(graph[0]["SitemapName"], "a");
        assert_eq!(graph[0]["CrawlFailures"][0]["Status"], 404);
        assert_eq!(graph[0]["LastModified"], "2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_compose_does_not_mutate_template() {
        let first = compose(&[report("a")]);
        assert_eq!(first["@graph"].as_array().unwrap().len(), 1);
        assert_eq!(vocab()["@graph"], Value::Array(vec![]));

        let empty = compose(std::iter::empty());
        assert_eq!(empty["@graph"], Value::Array(vec![]));
    }

    #[test]
    fn test_vocab_maps_report_fields() {
        let context = vocab()["@context"].as_object().unwrap();
        for term in ["SitemapName", "SuccessfulUrls", "CrawlFailures", "WarningStats"] {
            assert!(context.contains_key(term), "missing {}", term);
        }
    }
}

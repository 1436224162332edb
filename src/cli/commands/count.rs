//! Count crawl reports and the sitemaps they cover.

use console::style;
use tracing::warn;

use crate::config::Settings;
use crate::presentation;
use crate::reports::CancelToken;

use super::super::helpers::{build_pager, build_probe, spinner};

pub async fn cmd_count(settings: &Settings) -> anyhow::Result<()> {
    let pager = build_pager(settings)?;
    let probe = build_probe(settings)?;
    let cancel = CancelToken::new();

    let pb = spinner(format!("Counting reports in {}...", pager.store().describe()));
    let (reports, sitemaps) = tokio::join!(pager.count_reports(&cancel), async {
        match &probe {
            Some(probe) => match probe.run(&cancel).await {
                Ok(count) => count,
                Err(e) => {
                    warn!("Error fetching sitemap index {}: {}", probe.url(), e);
                    None
                }
            },
            None => None,
        }
    });
    pb.finish_and_clear();

    let reports = reports?.unwrap_or(0);
    println!("{} {} crawl reports", style("✓").green(), reports);

    match presentation::index_summary(Some(reports), sitemaps) {
        Some(summary) => println!("  {}", summary),
        None => println!(
            "  {} Sitemap index total unavailable",
            style("!").yellow()
        ),
    }
    Ok(())
}

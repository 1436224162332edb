//! Shared helper functions for CLI commands.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::presentation::{ItemCard, ReportView};
use crate::reports::{Dashboard, PageStatus, ReportPager};
use crate::sitemap_index::SitemapIndexProbe;
use crate::storage::create_store;

/// Spinner shown while waiting on the network.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.into());
    pb
}

/// Pager over the configured store.
pub fn build_pager(settings: &Settings) -> anyhow::Result<ReportPager> {
    let store = create_store(settings)?;
    Ok(ReportPager::new(store, &settings.prefix))
}

/// Sitemap index probe, if one is configured.
pub fn build_probe(settings: &Settings) -> anyhow::Result<Option<SitemapIndexProbe>> {
    let timeout = Duration::from_secs(settings.request_timeout);
    settings
        .sitemap_index_url
        .as_deref()
        .map(|url| SitemapIndexProbe::new(url, timeout))
        .transpose()
        .map_err(Into::into)
}

/// Mount a dashboard without the sitemap index probe.
pub fn mount_dashboard(settings: &Settings) -> anyhow::Result<Arc<Dashboard>> {
    Ok(Dashboard::mount(build_pager(settings)?, None))
}

/// Load pages in order until `through` (0-based) or the last page.
///
/// Returns the number of pages loaded. A page whose listing fails aborts.
pub async fn load_pages(dashboard: &Arc<Dashboard>, through: Option<usize>) -> anyhow::Result<usize> {
    let pb = spinner("Loading page 1...");
    let mut page = 0;

    loop {
        match dashboard.wait_for_page(page).await? {
            PageStatus::Failed(e) => {
                pb.finish_and_clear();
                anyhow::bail!(e);
            }
            PageStatus::Ready { next_token } => {
                if through == Some(page) || next_token.is_none() {
                    pb.finish_and_clear();
                    return Ok(page + 1);
                }
                page = dashboard.next()?;
                pb.set_message(format!("Loading page {}...", page + 1));
            }
            PageStatus::Loading => {}
        }
    }
}

/// Print one item of a page.
pub fn print_card(card: &ItemCard) {
    match (&card.report, &card.error) {
        (Some(report), _) => print_report(report),
        (None, Some(error)) => {
            println!("{} {}", style("✗").red(), style(&card.key).bold());
            println!("  Error loading report: {}", style(error).red());
        }
        (None, None) => {
            println!("{} {} (still loading)", style("…").dim(), card.key);
        }
    }
    println!();
}

/// Print one sitemap report.
pub fn print_report(report: &ReportView) {
    println!(
        "{} Sitemap: {}  {}",
        style("✓").green(),
        style(&report.name).bold(),
        style(format!("Last Modified: {}", report.last_modified)).dim()
    );
    println!(
        "  Sites Harvested: {} / {}",
        report.sites_harvested, report.sites_in_sitemap
    );
    println!("  Time to Complete: {}", report.duration);
    if let Some(link) = &report.source_link {
        println!("  Source: {}", link);
    }
    println!(
        "  {}",
        style(format!("Successful URLs ({})", report.successful_urls.len())).green()
    );

    if !report.failures.is_empty() {
        println!(
            "  {}",
            style(format!("Failures ({})", report.failures.len())).red()
        );
        for failure in &report.failures {
            let status = if failure.status.is_empty() {
                String::new()
            } else {
                format!("[{}] ", failure.status)
            };
            println!("    {}{} {}", status, failure.url, style(&failure.message).dim());
            if !failure.shacl_message.is_empty() {
                println!(
                    "      SHACL {}: {}",
                    failure.shacl_status, failure.shacl_message
                );
            }
        }
    }

    if let Some(warnings) = &report.warnings {
        println!(
            "  {}",
            style(format!("Semantic Warnings ({})", warnings.total)).yellow()
        );
        println!("    {}", style(&warnings.note).italic());
        for warning in &warnings.rows {
            println!(
                "    {} {}: {}",
                warning.url, warning.shacl_status, warning.message
            );
        }
    }
}

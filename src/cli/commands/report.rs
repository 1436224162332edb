//! Print crawl reports to the terminal.

use console::style;

use crate::config::Settings;
use crate::presentation;
use crate::reports::TotalCount;

use super::super::helpers::{load_pages, mount_dashboard, print_card};

/// Print page `page` (1-based), or every page with `all`.
pub async fn cmd_report(settings: &Settings, page: usize, all: bool) -> anyhow::Result<()> {
    if page == 0 {
        anyhow::bail!("Pages start at 1");
    }
    let target = page - 1;

    let dashboard = mount_dashboard(settings)?;
    let loaded = load_pages(&dashboard, (!all).then_some(target)).await;
    let total = dashboard.wait_for_total().await;
    dashboard.unmount();
    let loaded = loaded?;

    if !all && loaded <= target {
        anyhow::bail!(
            "Page {} does not exist, only {} page(s) of reports",
            page,
            loaded
        );
    }

    let pages: Vec<usize> = if all { (0..loaded).collect() } else { vec![target] };
    let total_pages = match total {
        TotalCount::Known(_) => dashboard
            .snapshot(0)
            .await
            .and_then(|s| s.total_pages),
        _ => None,
    };

    for index in pages {
        let Some(snapshot) = dashboard.snapshot(index).await else {
            continue;
        };
        println!(
            "{} {}",
            style("→").cyan(),
            style(presentation::page_label(index, total_pages)).bold()
        );
        println!();
        if snapshot.items.is_empty() {
            println!("  No crawl reports on this page");
        }
        for card in presentation::cards(&snapshot) {
            print_card(&card);
        }
    }

    if let TotalCount::Known(n) = total {
        println!("{} {} crawl reports in total", style("✓").green(), n);
    }
    Ok(())
}

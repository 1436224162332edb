//! Export every crawl report as JSON or JSON-LD.

use std::path::Path;

use console::style;

use crate::config::Settings;
use crate::jsonld;

use super::super::helpers::{load_pages, mount_dashboard};
use super::ExportFormat;

pub async fn cmd_export(
    settings: &Settings,
    format: ExportFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let dashboard = mount_dashboard(settings)?;
    let loaded = load_pages(&dashboard, None).await;
    dashboard.unmount();
    let pages = loaded?;

    let reports = dashboard.all_reports().await;
    let body = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&reports)?,
        ExportFormat::Jsonld => serde_json::to_string_pretty(&jsonld::compose(&reports))?,
    };

    match output {
        Some(path) => {
            tokio::fs::write(path, body).await?;
            eprintln!(
                "{} Wrote {} reports from {} page(s) to {}",
                style("✓").green(),
                reports.len(),
                pages,
                path.display()
            );
        }
        None => println!("{}", body),
    }
    Ok(())
}

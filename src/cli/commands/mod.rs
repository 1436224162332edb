//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod count;
mod export;
mod report;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "crawl-status")]
#[command(about = "Status dashboard for Geoconnex sitemap crawl reports")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read reports from the public GCS bucket instead of local MinIO
    #[arg(long, global = true)]
    gcp: bool,

    /// Bucket to read reports from (overrides config and environment)
    #[arg(long, global = true)]
    bucket: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Export file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Array of crawl reports
    #[default]
    Json,
    /// JSON-LD document with one graph node per sitemap
    Jsonld,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web dashboard
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default: 127.0.0.1:3030)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print crawl reports to the terminal
    Report {
        /// Page to show, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,
        /// Show every page
        #[arg(short, long)]
        all: bool,
    },

    /// Export every crawl report
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Count reports and sitemaps in the index
    Count,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let settings = load_settings(&options)
        .await?
        .with_cli_overrides(cli.gcp, cli.bucket.as_deref());

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(&settings, bind.as_deref()).await,
        Commands::Report { page, all } => report::cmd_report(&settings, page, all).await,
        Commands::Export { format, output } => {
            export::cmd_export(&settings, format, output.as_deref()).await
        }
        Commands::Count => count::cmd_count(&settings).await,
    }
}

//! Web server for the crawl status dashboard.
//!
//! One [`Dashboard`] lives for the whole process. Handlers read snapshots
//! from it and trigger page loads; they never wait for a load to finish,
//! so pages that are still loading render placeholders and refresh.

mod assets;
mod cache;
mod handlers;
mod routes;
mod template_structs;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Settings;
use crate::reports::{Dashboard, ReportPager};
use crate::sitemap_index::SitemapIndexProbe;
use crate::storage::{create_store, ReportStore};

use cache::ExportCache;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    /// Store location shown in error banners.
    pub endpoint: String,
    pub sitemap_index_url: Option<String>,
    pub export_cache: Arc<ExportCache>,
}

impl AppState {
    pub fn new(
        dashboard: Arc<Dashboard>,
        store: &dyn ReportStore,
        sitemap_index_url: Option<String>,
    ) -> Self {
        Self {
            dashboard,
            endpoint: store.describe(),
            sitemap_index_url,
            export_cache: Arc::new(ExportCache::new()),
        }
    }

    /// Build the store from settings and mount the dashboard.
    pub fn mount(settings: &Settings) -> anyhow::Result<Self> {
        let store = create_store(settings)?;

        let probe = match settings.sitemap_index_url.as_deref() {
            Some(url) => {
                match SitemapIndexProbe::new(url, Duration::from_secs(settings.request_timeout)) {
                    Ok(probe) => Some(probe),
                    Err(e) => {
                        warn!("Sitemap index probe disabled: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let pager = ReportPager::new(Arc::clone(&store), &settings.prefix);
        let dashboard = Dashboard::mount(pager, probe);
        Ok(Self::new(
            dashboard,
            store.as_ref(),
            settings.sitemap_index_url.clone(),
        ))
    }
}

/// Start the web server and run until Ctrl+C.
pub async fn serve(settings: &Settings, addr: SocketAddr) -> anyhow::Result<()> {
    let state = AppState::mount(settings)?;
    let dashboard = Arc::clone(&state.dashboard);
    let app = create_router(state);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dashboard.unmount();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

//! Router configuration for the web server.

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard_page))
        // Page snapshots and dashboard status
        .route("/api/page/:page", get(handlers::api_page))
        .route("/api/status", get(handlers::api_status))
        // Downloads of everything loaded so far
        .route("/export/report.json", get(handlers::export_json))
        .route("/export/report.jsonld", get(handlers::export_jsonld))
        .route("/static/style.css", get(handlers::serve_css))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

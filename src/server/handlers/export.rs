//! Downloads of every report loaded so far.

use axum::{extract::State, http::header, response::IntoResponse};

use super::super::AppState;
use crate::jsonld::JSONLD_CONTENT_TYPE;

/// All loaded reports as a pretty JSON array.
pub async fn export_json(State(state): State<AppState>) -> impl IntoResponse {
    let reports = state.dashboard.all_reports().await;
    let body = state.export_cache.json(&reports);
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"crawl-report.json\"",
            ),
        ],
        body.as_str().to_owned(),
    )
}

/// All loaded reports as a JSON-LD document.
pub async fn export_jsonld(State(state): State<AppState>) -> impl IntoResponse {
    let reports = state.dashboard.all_reports().await;
    let body = state.export_cache.jsonld(&reports);
    (
        [
            (header::CONTENT_TYPE, JSONLD_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=\"crawl-report.jsonld\"",
            ),
        ],
        body.as_str().to_owned(),
    )
}

//! API endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::super::AppState;
use super::helpers::{navigation_status, open_page};

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Snapshot of one page, starting its load if needed.
pub async fn api_page(State(state): State<AppState>, Path(page): Path<usize>) -> Response {
    match open_page(&state, page, false).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => (
            navigation_status(&e),
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Dashboard phase, counts and cached pages.
pub async fn api_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.status())
}

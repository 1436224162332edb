//! Helper types and utility functions for handlers.

use axum::http::StatusCode;
use serde::Deserialize;

use super::super::AppState;
use crate::reports::{NavigationError, PageSnapshot};

/// Query params for the dashboard page.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// 0-based page index.
    pub page: Option<usize>,
    /// List the page again even if it is cached with an error.
    #[serde(default)]
    pub reload: bool,
}

/// HTTP status for a navigation failure.
pub fn navigation_status(err: &NavigationError) -> StatusCode {
    match err {
        NavigationError::Unreachable(_) | NavigationError::AtFirstPage => StatusCode::NOT_FOUND,
        NavigationError::Unmounted => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Start loading `page` if needed and return what is known about it now.
pub async fn open_page(
    state: &AppState,
    page: usize,
    reload: bool,
) -> Result<PageSnapshot, NavigationError> {
    if reload {
        state.dashboard.navigate(page)?;
    } else {
        state.dashboard.visit(page)?;
    }
    state
        .dashboard
        .snapshot(page)
        .await
        .ok_or(NavigationError::Unreachable(page))
}

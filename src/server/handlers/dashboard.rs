//! Dashboard page handler.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use super::super::template_structs::{DashboardTemplate, ErrorTemplate};
use super::super::AppState;
use super::helpers::{navigation_status, open_page, PageParams};
use crate::presentation::{self, DASHBOARD_TITLE};
use crate::reports::TotalCount;

/// Render one page of reports.
///
/// Items still loading render as placeholders and the page reloads itself
/// until they settle.
pub async fn dashboard_page(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Response {
    let page = params.page.unwrap_or(0);

    let snapshot = match open_page(&state, page, params.reload).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            let msg = format!("Page {} is not available: {}", page.saturating_add(1), e);
            let template = ErrorTemplate {
                title: DASHBOARD_TITLE,
                message: &msg,
            };
            return (
                navigation_status(&e),
                Html(template.render().unwrap_or(msg)),
            )
                .into_response();
        }
    };

    let counting = snapshot.total_reports == TotalCount::Counting;
    let template = DashboardTemplate {
        title: DASHBOARD_TITLE,
        endpoint: &state.endpoint,
        page,
        page_label: presentation::page_label(page, snapshot.total_pages),
        page_error: snapshot.error.clone(),
        cards: presentation::cards(&snapshot),
        prev_page: page.checked_sub(1),
        next_page: snapshot.has_next.then_some(page + 1),
        refresh: snapshot.loading || snapshot.pending() > 0,
        counting,
        index_summary: presentation::index_summary(
            snapshot.total_reports.known(),
            snapshot.sitemaps_in_index,
        ),
        sitemap_index_url: state.sitemap_index_url.as_deref().unwrap_or(""),
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Template error: {}", e),
        )
            .into_response(),
    }
}

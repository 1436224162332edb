//! Askama template structs for the web interface.
//!
//! Each struct corresponds to an HTML template in the templates/ directory.
//! Askama provides compile-time verification that templates are valid.

use askama::Template;

use crate::presentation::ItemCard;

/// Dashboard page template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate<'a> {
    pub title: &'a str,
    /// Store location shown in the error banner.
    pub endpoint: &'a str,
    pub page: usize,
    pub page_label: String,
    pub page_error: Option<String>,
    pub cards: Vec<ItemCard>,
    pub prev_page: Option<usize>,
    pub next_page: Option<usize>,
    /// Reload the page until every item settles.
    pub refresh: bool,
    pub counting: bool,
    pub index_summary: Option<String>,
    pub sitemap_index_url: &'a str,
}

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub title: &'a str,
    pub message: &'a str,
}

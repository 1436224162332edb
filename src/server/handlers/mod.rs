//! HTTP request handlers for the web server.

mod api;
mod dashboard;
mod export;
mod helpers;
mod static_files;

// Re-export handlers for use by the router
pub use api::{api_page, api_status, health};
pub use dashboard::dashboard_page;
pub use export::{export_json, export_jsonld};
pub use static_files::serve_css;

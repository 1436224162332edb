//! Loading crawl reports page by page.
//!
//! [`ReportPager`] talks to the store, [`PageItems`] holds per-object
//! state for one page, and [`Dashboard`] ties pages, the report count and
//! the sitemap index probe together under one cancellation token.

mod cancel;
mod dashboard;
mod pager;
mod state;

pub use cancel::CancelToken;
pub use dashboard::{
    Dashboard, DashboardStatus, NavigationError, PageSnapshot, PageStatus, Phase, TotalCount,
};
pub use pager::{
    FetchError, ListedPage, PageLoad, ReportPager, COUNT_PAGE_SIZE, PAGE_SIZE, UNKNOWN_TIMESTAMP,
};
pub use state::{PageItems, SharedItems};

//! crawl-status - status dashboard for Geoconnex sitemap crawls.
//!
//! The harvester writes one JSON report per sitemap into an object store.
//! This crate lists and fetches those reports page by page, serves them as
//! a web dashboard, and exports them as JSON or JSON-LD.

pub mod cli;
pub mod config;
pub mod jsonld;
pub mod models;
pub mod presentation;
pub mod reports;
pub mod server;
pub mod sitemap_index;
pub mod storage;

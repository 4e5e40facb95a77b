//! Crawler module for site crawling and page indexing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with the failure status taxonomy
//! - HTML parsing, link extraction and visible-text extraction
//! - Shared crawl state: visited set, run flag, fetch permits
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, FetchFailure, FetchedPage, Fetcher};
pub use parser::{extract_text, extract_title, parse_html, ParsedPage};
pub use scheduler::{CrawlControl, FetchLimiter, VisitedSet};

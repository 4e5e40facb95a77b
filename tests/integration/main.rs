//! Integration tests for Lemmascope
//!
//! These tests use wiremock to serve small sites and tempfile databases to
//! run crawls, single-page indexing and searches end-to-end.

mod common;
mod crawl_tests;
mod search_tests;

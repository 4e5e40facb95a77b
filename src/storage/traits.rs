//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::SiteStatus;
use crate::storage::{IndexRecord, LemmaRecord, PageRecord, SiteRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Site not found: {0}")]
    SiteNotFound(i64),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Lemma not found: {0}")]
    LemmaNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl StorageError {
    /// True for errors a caller may resolve by retrying the write
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Records reference each other only by id. Writers are serialized by the
/// lock around the shared storage, so every method here runs alone.
pub trait Storage {
    // ===== Sites =====

    /// Creates a site row and returns its id
    fn insert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64>;

    /// Gets a site by id
    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord>;

    /// Gets a site by its configured root URL
    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Lists all sites ordered by id
    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    /// Sets the status and last error, refreshing the status time
    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()>;

    /// Refreshes the status time only (crawl liveness heartbeat)
    fn touch_site(&mut self, site_id: i64) -> StorageResult<()>;

    /// Deletes a site row
    fn delete_site(&mut self, site_id: i64) -> StorageResult<()>;

    // ===== Pages =====

    /// Inserts a page or replaces code and content of the existing row at
    /// the same path, keeping its id
    fn upsert_page(&mut self, site_id: i64, path: &str, code: i32, content: &str)
        -> StorageResult<i64>;

    /// Gets a page by id
    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord>;

    /// Finds a page by site and path
    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>>;

    /// Gets the pages with the given ids (missing ids are skipped)
    fn get_pages(&self, page_ids: &[i64]) -> StorageResult<Vec<PageRecord>>;

    /// Counts pages of a site
    fn count_pages(&self, site_id: i64) -> StorageResult<u64>;

    /// Deletes all pages of a site
    fn delete_pages_for_site(&mut self, site_id: i64) -> StorageResult<()>;

    // ===== Lemmas =====

    /// Creates the lemma with frequency 1, or adds 1 to an existing row,
    /// in one statement; returns the updated record
    fn increment_lemma(&mut self, site_id: i64, lemma: &str) -> StorageResult<LemmaRecord>;

    /// Subtracts 1 from a lemma's frequency, never going below zero
    fn decrement_lemma(&mut self, lemma_id: i64) -> StorageResult<()>;

    /// Finds a lemma by site and text
    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    /// Gets a lemma by id
    fn get_lemma(&self, lemma_id: i64) -> StorageResult<LemmaRecord>;

    /// Counts lemmas of a site
    fn count_lemmas(&self, site_id: i64) -> StorageResult<u64>;

    /// Deletes all lemmas of a site
    fn delete_lemmas_for_site(&mut self, site_id: i64) -> StorageResult<()>;

    // ===== Search index =====

    /// Creates an index row, or adds `rank` to the existing row for the pair
    fn add_index(&mut self, page_id: i64, lemma_id: i64, rank: i64) -> StorageResult<()>;

    /// Gets all index rows of a page
    fn indexes_for_page(&self, page_id: i64) -> StorageResult<Vec<IndexRecord>>;

    /// Gets all index rows referencing a lemma
    fn indexes_for_lemma(&self, lemma_id: i64) -> StorageResult<Vec<IndexRecord>>;

    /// Gets the index rows referencing a lemma, restricted to the given pages
    fn indexes_for_lemma_in_pages(
        &self,
        lemma_id: i64,
        page_ids: &[i64],
    ) -> StorageResult<Vec<IndexRecord>>;

    /// Deletes all index rows of a page
    fn delete_indexes_for_page(&mut self, page_id: i64) -> StorageResult<()>;

    /// Deletes all index rows of every page of a site
    fn delete_indexes_for_site(&mut self, site_id: i64) -> StorageResult<()>;
}

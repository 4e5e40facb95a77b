//! Storage module for persisting sites, pages, lemmas and index rows
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Site status persistence
//! - Page, lemma and search index bookkeeping

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::SiteStatus;
use crate::SearchError;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage handle shared by crawl tasks, the index maintainer and search
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Opens (or creates) the database and wraps it for sharing across tasks
pub fn open_storage(path: &Path) -> Result<SharedStorage, SearchError> {
    let storage = SqliteStorage::new(path)?;
    Ok(Arc::new(Mutex::new(storage)))
}

/// Locks the shared storage, mapping a poisoned lock to a storage error
pub fn lock_storage(
    storage: &SharedStorage,
) -> StorageResult<MutexGuard<'_, dyn Storage + Send + 'static>> {
    storage
        .lock()
        .map_err(|e| StorageError::Database(format!("storage lock poisoned: {}", e)))
}

/// Represents a configured site in the database
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
}

/// Represents a fetched page
///
/// `content` holds the fetched markup, or a diagnostic message when the
/// fetch failed.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub code: i32,
    pub content: String,
}

impl PageRecord {
    /// True if the page was fetched with a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Represents a lemma known for a site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LemmaRecord {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    pub frequency: i64,
}

/// Represents a page to lemma posting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub id: i64,
    pub page_id: i64,
    pub lemma_id: i64,
    pub rank: i64,
}

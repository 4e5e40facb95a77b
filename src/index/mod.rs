//! Inverted index maintenance
//!
//! Keeps per-site lemma frequencies and page postings in step with page
//! content. A lemma's frequency is the number of pages of the site that
//! contain it, so it always equals the number of index rows referencing it.

use crate::crawler::extract_text;
use crate::lemma::Lemmatizer;
use crate::storage::{lock_storage, SharedStorage, Storage, StorageResult};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// How often a write that hit a uniqueness race is attempted
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Applies page content to the index
#[derive(Clone)]
pub struct IndexMaintainer {
    storage: SharedStorage,
    lemmatizer: Arc<Lemmatizer>,
}

impl IndexMaintainer {
    pub fn new(storage: SharedStorage, lemmatizer: Arc<Lemmatizer>) -> Self {
        Self {
            storage,
            lemmatizer,
        }
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    pub fn lemmatizer(&self) -> &Arc<Lemmatizer> {
        &self.lemmatizer
    }

    /// Stores a fetched page and indexes its content
    ///
    /// A page seen for the first time is indexed from scratch. A page that
    /// already exists keeps its id; its previous contribution is removed
    /// first (each referenced lemma loses one page, its index rows are
    /// deleted) and the new content is indexed. Pages without a 2xx status
    /// are stored but contribute nothing.
    ///
    /// Returns the page id.
    pub fn index_page(&self, site_id: i64, path: &str, code: i32, content: &str) -> Result<i64> {
        let counts = if (200..300).contains(&code) {
            self.lemmatizer.lemmas_with_counts(&extract_text(content))
        } else {
            HashMap::new()
        };

        let mut storage = lock_storage(&self.storage)?;

        let existing = storage.find_page(site_id, path)?;
        let page_id = storage.upsert_page(site_id, path, code, content)?;

        if existing.is_some() {
            remove_contribution(&mut *storage, page_id)?;
        }
        apply_counts(&mut *storage, site_id, page_id, &counts)?;

        tracing::debug!(
            "Indexed page {} (site {}, {} lemmas, refresh: {})",
            path,
            site_id,
            counts.len(),
            existing.is_some()
        );
        Ok(page_id)
    }

    /// Deletes a site with all its pages, lemmas and index rows
    ///
    /// Children go first: index rows, then lemmas, then pages, then the site.
    pub fn reset_site(&self, site_id: i64) -> Result<()> {
        let mut storage = lock_storage(&self.storage)?;
        storage.delete_indexes_for_site(site_id)?;
        storage.delete_lemmas_for_site(site_id)?;
        storage.delete_pages_for_site(site_id)?;
        storage.delete_site(site_id)?;
        tracing::debug!("Reset site {}", site_id);
        Ok(())
    }
}

/// Undoes a page's previous contribution to its site's lemmas
fn remove_contribution(storage: &mut dyn Storage, page_id: i64) -> StorageResult<()> {
    let rows = storage.indexes_for_page(page_id)?;
    for row in &rows {
        storage.decrement_lemma(row.lemma_id)?;
    }
    storage.delete_indexes_for_page(page_id)
}

fn apply_counts(
    storage: &mut dyn Storage,
    site_id: i64,
    page_id: i64,
    counts: &HashMap<String, usize>,
) -> StorageResult<()> {
    let mut lemmas: Vec<(&String, &usize)> = counts.iter().collect();
    lemmas.sort();

    for (lemma, count) in lemmas {
        let record = with_retry(|| storage.increment_lemma(site_id, lemma))?;
        with_retry(|| storage.add_index(page_id, record.id, *count as i64))?;
    }
    Ok(())
}

/// Retries a write that lost a uniqueness race against another writer
fn with_retry<T>(mut write: impl FnMut() -> StorageResult<T>) -> StorageResult<T> {
    let mut attempt = 1;
    loop {
        match write() {
            Err(e) if e.is_constraint_violation() && attempt < MAX_WRITE_ATTEMPTS => {
                tracing::debug!("Retrying write after conflict (attempt {}): {}", attempt, e);
                attempt += 1;
            }
            result => return result,
        }
    }
}

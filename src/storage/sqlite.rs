//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::SiteStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{IndexRecord, LemmaRecord, PageRecord, SiteRecord};
use crate::SearchError;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

/// Upper bound on ids bound into one `IN (...)` list
const ID_CHUNK: usize = 500;

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";
const PAGE_COLUMNS: &str = "id, site_id, path, code, content";
const LEMMA_COLUMNS: &str = "id, site_id, lemma, frequency";
const INDEX_COLUMNS: &str = "id, page_id, lemma_id, rank";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SearchError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SearchError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SearchError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Maps unique/check failures to `ConstraintViolation` so writers can retry
fn map_write_error(e: rusqlite::Error) -> StorageError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg) if err.code == ErrorCode::ConstraintViolation => {
            StorageError::ConstraintViolation(msg.unwrap_or_else(|| err.to_string()))
        }
        other => StorageError::Sqlite(other),
    }
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    Ok(SiteRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status: SiteStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SiteStatus::Failed),
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

fn lemma_from_row(row: &Row<'_>) -> rusqlite::Result<LemmaRecord> {
    Ok(LemmaRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        lemma: row.get(2)?,
        frequency: row.get(3)?,
    })
}

fn index_from_row(row: &Row<'_>) -> rusqlite::Result<IndexRecord> {
    Ok(IndexRecord {
        id: row.get(0)?,
        page_id: row.get(1)?,
        lemma_id: row.get(2)?,
        rank: row.get(3)?,
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

impl Storage for SqliteStorage {
    // ===== Sites =====

    fn insert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64> {
        self.conn
            .execute(
                "INSERT INTO sites (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
                params![url, name, status.to_db_string(), now()],
            )
            .map_err(map_write_error)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE id = ?1", SITE_COLUMNS),
                params![site_id],
                site_from_row,
            )
            .optional()?
            .ok_or(StorageError::SiteNotFound(site_id))
    }

    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let site = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE url = ?1", SITE_COLUMNS),
                params![url],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM sites ORDER BY id", SITE_COLUMNS))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3 WHERE id = ?4",
            params![status.to_db_string(), now(), last_error, site_id],
        )?;
        if updated == 0 {
            return Err(StorageError::SiteNotFound(site_id));
        }
        Ok(())
    }

    fn touch_site(&mut self, site_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE sites SET status_time = ?1 WHERE id = ?2",
            params![now(), site_id],
        )?;
        Ok(())
    }

    fn delete_site(&mut self, site_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM sites WHERE id = ?1", params![site_id])?;
        Ok(())
    }

    // ===== Pages =====

    fn upsert_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: i32,
        content: &str,
    ) -> StorageResult<i64> {
        let id = self
            .conn
            .query_row(
                "INSERT INTO pages (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(site_id, path) DO UPDATE SET code = excluded.code, content = excluded.content
                 RETURNING id",
                params![site_id, path, code, content],
                |row| row.get(0),
            )
            .map_err(map_write_error)?;
        Ok(id)
    }

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS),
                params![page_id],
                page_from_row,
            )
            .optional()?
            .ok_or(StorageError::PageNotFound(page_id))
    }

    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM pages WHERE site_id = ?1 AND path = ?2",
                    PAGE_COLUMNS
                ),
                params![site_id, path],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn get_pages(&self, page_ids: &[i64]) -> StorageResult<Vec<PageRecord>> {
        let mut pages = Vec::with_capacity(page_ids.len());
        for chunk in page_ids.chunks(ID_CHUNK) {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {} FROM pages WHERE id IN ({}) ORDER BY id",
                PAGE_COLUMNS,
                placeholders(chunk.len())
            ))?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), page_from_row)?;
            for row in rows {
                pages.push(row?);
            }
        }
        Ok(pages)
    }

    fn count_pages(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn delete_pages_for_site(&mut self, site_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM pages WHERE site_id = ?1", params![site_id])?;
        Ok(())
    }

    // ===== Lemmas =====

    fn increment_lemma(&mut self, site_id: i64, lemma: &str) -> StorageResult<LemmaRecord> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "INSERT INTO lemmas (site_id, lemma, frequency) VALUES (?1, ?2, 1)
                     ON CONFLICT(site_id, lemma) DO UPDATE SET frequency = frequency + 1
                     RETURNING {}",
                    LEMMA_COLUMNS
                ),
                params![site_id, lemma],
                lemma_from_row,
            )
            .map_err(map_write_error)?;
        Ok(record)
    }

    fn decrement_lemma(&mut self, lemma_id: i64) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE lemmas SET frequency = MAX(frequency - 1, 0) WHERE id = ?1",
            params![lemma_id],
        )?;
        if updated == 0 {
            return Err(StorageError::LemmaNotFound(lemma_id));
        }
        Ok(())
    }

    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM lemmas WHERE site_id = ?1 AND lemma = ?2",
                    LEMMA_COLUMNS
                ),
                params![site_id, lemma],
                lemma_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn get_lemma(&self, lemma_id: i64) -> StorageResult<LemmaRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM lemmas WHERE id = ?1", LEMMA_COLUMNS),
                params![lemma_id],
                lemma_from_row,
            )
            .optional()?
            .ok_or(StorageError::LemmaNotFound(lemma_id))
    }

    fn count_lemmas(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lemmas WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn delete_lemmas_for_site(&mut self, site_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM lemmas WHERE site_id = ?1", params![site_id])?;
        Ok(())
    }

    // ===== Search index =====

    fn add_index(&mut self, page_id: i64, lemma_id: i64, rank: i64) -> StorageResult<()> {
        self.conn
            .execute(
                "INSERT INTO search_index (page_id, lemma_id, rank) VALUES (?1, ?2, ?3)
                 ON CONFLICT(page_id, lemma_id) DO UPDATE SET rank = rank + excluded.rank",
                params![page_id, lemma_id, rank],
            )
            .map_err(map_write_error)?;
        Ok(())
    }

    fn indexes_for_page(&self, page_id: i64) -> StorageResult<Vec<IndexRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM search_index WHERE page_id = ?1 ORDER BY id",
            INDEX_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![page_id], index_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn indexes_for_lemma(&self, lemma_id: i64) -> StorageResult<Vec<IndexRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM search_index WHERE lemma_id = ?1 ORDER BY page_id",
            INDEX_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![lemma_id], index_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn indexes_for_lemma_in_pages(
        &self,
        lemma_id: i64,
        page_ids: &[i64],
    ) -> StorageResult<Vec<IndexRecord>> {
        let mut found = Vec::new();
        for chunk in page_ids.chunks(ID_CHUNK) {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {} FROM search_index WHERE lemma_id = ? AND page_id IN ({}) ORDER BY page_id",
                INDEX_COLUMNS,
                placeholders(chunk.len())
            ))?;
            let params = std::iter::once(&lemma_id).chain(chunk.iter());
            let rows = stmt.query_map(params_from_iter(params), index_from_row)?;
            for row in rows {
                found.push(row?);
            }
        }
        Ok(found)
    }

    fn delete_indexes_for_page(&mut self, page_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM search_index WHERE page_id = ?1", params![page_id])?;
        Ok(())
    }

    fn delete_indexes_for_site(&mut self, site_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "DELETE FROM search_index WHERE page_id IN (SELECT id FROM pages WHERE site_id = ?1)",
            params![site_id],
        )?;
        Ok(())
    }
}

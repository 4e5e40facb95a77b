//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Lemmascope database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Configured sites and their indexing status
CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('INDEXING', 'INDEXED', 'FAILED')),
    status_time TEXT NOT NULL,
    last_error TEXT
);

-- Fetched pages, one row per site-relative path
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    path TEXT NOT NULL,
    code INTEGER NOT NULL,
    content TEXT NOT NULL,
    UNIQUE(site_id, path)
);

CREATE INDEX IF NOT EXISTS idx_pages_site ON pages(site_id);

-- Per-site lemma statistics; frequency counts pages containing the lemma
CREATE TABLE IF NOT EXISTS lemmas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    lemma TEXT NOT NULL,
    frequency INTEGER NOT NULL DEFAULT 0 CHECK (frequency >= 0),
    UNIQUE(site_id, lemma)
);

CREATE INDEX IF NOT EXISTS idx_lemmas_site ON lemmas(site_id);

-- Page to lemma postings; rank is the lemma's occurrence count on the page
CREATE TABLE IF NOT EXISTS search_index (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    lemma_id INTEGER NOT NULL REFERENCES lemmas(id) ON DELETE CASCADE,
    rank INTEGER NOT NULL CHECK (rank >= 0),
    UNIQUE(page_id, lemma_id)
);

CREATE INDEX IF NOT EXISTS idx_search_index_page ON search_index(page_id);
CREATE INDEX IF NOT EXISTS idx_search_index_lemma ON search_index(lemma_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

//! Lemmascope: self-hosted lexical search over your own web sites
//!
//! This crate crawls a configured set of sites, maintains a per-site inverted
//! index over word lemmas, and answers relevance-ranked queries with
//! highlighted snippets.

pub mod config;
pub mod crawler;
pub mod index;
pub mod lemma;
pub mod output;
pub mod search;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Message recorded on a site when the user stops a crawl
pub const STOPPED_BY_USER: &str = "Indexing stopped by user";

/// Main error type for Lemmascope operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Page is outside the configured sites: {url}")]
    OutOfScope { url: String },

    #[error("Site is currently being indexed: {url}")]
    SiteBusy { url: String },

    #[error("Indexing is already running")]
    AlreadyRunning,

    #[error("Indexing is not running")]
    NotRunning,

    #[error("{}", STOPPED_BY_USER)]
    Cancelled,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Lemmascope operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use lemma::{Language, Lemmatizer};
pub use search::{SearchEngine, SearchResponse, SearchResult};
pub use state::SiteStatus;
pub use url::{extract_domain, normalize_link, LinkFilter};

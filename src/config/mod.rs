//! Configuration module for Lemmascope
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use lemmascope::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("lemmascope.toml")).unwrap();
//! println!("Politeness delay: {}ms", config.connection.politeness_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ConnectionConfig, CrawlerConfig, LemmatizerConfig, OutputConfig, SiteEntry,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

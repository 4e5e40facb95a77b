//! Statistics generation from the index database
//!
//! This module provides functionality for extracting and displaying
//! index statistics from the storage layer.

use crate::state::SiteStatus;
use crate::storage::{Storage, StorageResult};

/// Index statistics summary
#[derive(Debug, Clone)]
pub struct IndexStatistics {
    /// Number of configured sites stored in the database
    pub sites: u64,

    /// Total number of stored pages across all sites
    pub pages: u64,

    /// Total number of distinct lemmas across all sites
    pub lemmas: u64,

    /// Whether a crawl run is in progress
    pub indexing: bool,

    /// Per-site breakdown, in site id order
    pub detailed: Vec<SiteStatistics>,
}

/// Statistics of one stored site
#[derive(Debug, Clone)]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
    pub pages: u64,
    pub lemmas: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `indexing` - Whether a crawl run is currently in progress
pub fn load_statistics(storage: &dyn Storage, indexing: bool) -> StorageResult<IndexStatistics> {
    let sites = storage.list_sites()?;

    let mut detailed = Vec::with_capacity(sites.len());
    for site in sites {
        let pages = storage.count_pages(site.id)?;
        let lemmas = storage.count_lemmas(site.id)?;
        detailed.push(SiteStatistics {
            url: site.url,
            name: site.name,
            status: site.status,
            status_time: site.status_time,
            last_error: site.last_error,
            pages,
            lemmas,
        });
    }

    Ok(IndexStatistics {
        sites: detailed.len() as u64,
        pages: detailed.iter().map(|s| s.pages).sum(),
        lemmas: detailed.iter().map(|s| s.lemmas).sum(),
        indexing,
        detailed,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IndexStatistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Sites: {}", stats.sites);
    println!("  Pages: {}", stats.pages);
    println!("  Lemmas: {}", stats.lemmas);
    println!("  Indexing in progress: {}", if stats.indexing { "yes" } else { "no" });
    println!();

    if stats.detailed.is_empty() {
        println!("No sites have been indexed yet.");
        return;
    }

    println!("Sites:");
    for site in &stats.detailed {
        println!("  {} ({})", site.name, site.url);
        println!("    Status: {} at {}", site.status, site.status_time);
        println!("    Pages: {}, lemmas: {}", site.pages, site.lemmas);
        if let Some(error) = &site.last_error {
            println!("    Last error: {}", error);
        }
    }

    let searchable = stats
        .detailed
        .iter()
        .filter(|site| site.status.is_searchable())
        .count();
    println!();
    println!("Searchable sites: {} / {}", searchable, stats.sites);
}

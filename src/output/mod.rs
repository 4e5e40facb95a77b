//! Output module for index statistics and reports
//!
//! This module handles:
//! - Collecting totals and a per-site breakdown of the index
//! - Printing them for the command line

pub mod stats;

pub use stats::{load_statistics, print_statistics, IndexStatistics, SiteStatistics};

//! State module for tracking indexing progress
//!
//! # Components
//!
//! - `SiteStatus`: the lifecycle of a configured site (indexing, indexed, failed)

mod site_status;

pub use site_status::SiteStatus;

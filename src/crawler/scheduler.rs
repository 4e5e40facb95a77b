//! Shared crawl state
//!
//! This module handles:
//! - The per-run visited set that gives every URL to exactly one branch
//! - The run flag used to reject overlapping runs and to stop a run
//! - Global concurrency limiting of fetches via a semaphore

use crate::{Result, SearchError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// URLs already claimed during one crawl run
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    urls: Arc<Mutex<HashSet<String>>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a URL for the calling branch
    ///
    /// Returns true exactly once per URL; every later call returns false.
    pub fn claim(&self, url: &str) -> bool {
        match self.urls.lock() {
            Ok(mut urls) => urls.insert(url.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(url.to_string()),
        }
    }

    /// Number of URLs claimed so far
    pub fn claimed_count(&self) -> usize {
        match self.urls.lock() {
            Ok(urls) => urls.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// Run flag shared by the coordinator, its crawl tasks and the stop command
///
/// `running` spans the whole run, including the time tasks need to wind
/// down after a stop, so a new run cannot overlap a stopping one.
#[derive(Debug, Clone, Default)]
pub struct CrawlControl {
    running: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl CrawlControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a run as started; fails if one is already in progress
    pub fn try_start(&self) -> Result<()> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SearchError::AlreadyRunning)?;
        self.cancelled.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Asks the current run to stop; fails if nothing is running
    pub fn stop(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(SearchError::NotRunning);
        }
        self.cancelled.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Clears the run flag once every task has joined
    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// True once a stop was requested for the current run
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Bounds the number of fetches in flight across all sites
#[derive(Debug, Clone)]
pub struct FetchLimiter {
    semaphore: Arc<Semaphore>,
}

impl FetchLimiter {
    pub fn new(max_concurrent_fetches: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent_fetches.max(1))),
        }
    }

    /// Waits for a fetch slot
    ///
    /// Hold the permit only around the fetch itself, never across a join on
    /// child tasks.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SearchError::Io(std::io::Error::other(e)))
    }
}

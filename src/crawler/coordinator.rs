//! Crawler coordinator - crawl orchestration and site status transitions
//!
//! This module contains:
//! - Full crawl runs: reset every configured site, then crawl all sites
//!   concurrently, one top-level task per site
//! - The recursive per-site crawl: every page spawns a task per newly
//!   claimed link and joins them before it completes
//! - Cooperative stop of a running crawl
//! - Re-indexing of a single page

use crate::config::{Config, SiteEntry};
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::scheduler::{CrawlControl, FetchLimiter, VisitedSet};
use crate::index::IndexMaintainer;
use crate::lemma::Lemmatizer;
use crate::output::{load_statistics, IndexStatistics};
use crate::search::SearchEngine;
use crate::state::SiteStatus;
use crate::storage::{lock_storage, open_storage, SharedStorage, Storage};
use crate::url::{normalize_link, page_path, LinkFilter};
use crate::{Result, SearchError, STOPPED_BY_USER};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use url::Url;

type CrawlFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Main crawler coordinator structure
///
/// Cloning is cheap and every clone drives the same storage and run flag,
/// so a clone can stop a crawl started from another one.
#[derive(Clone)]
pub struct Coordinator {
    config: Arc<Config>,
    maintainer: IndexMaintainer,
    fetcher: Fetcher,
    limiter: FetchLimiter,
    control: CrawlControl,
}

/// Everything one site's crawl tasks share
struct SiteCrawl {
    site_id: i64,
    root: Url,
    filter: LinkFilter,
    visited: VisitedSet,
    fetcher: Fetcher,
    limiter: FetchLimiter,
    control: CrawlControl,
    maintainer: IndexMaintainer,
}

impl Coordinator {
    /// Creates a coordinator over an existing storage handle
    ///
    /// The lemmatizer is built here, once, for the configured languages.
    pub fn new(config: Config, storage: SharedStorage) -> Result<Self> {
        let lemmatizer = Arc::new(Lemmatizer::new(config.languages()));
        Self::with_lemmatizer(config, storage, lemmatizer)
    }

    /// Creates a coordinator with a prebuilt lemmatizer
    pub fn with_lemmatizer(
        config: Config,
        storage: SharedStorage,
        lemmatizer: Arc<Lemmatizer>,
    ) -> Result<Self> {
        let fetcher = Fetcher::new(&config.connection)?;
        let limiter = FetchLimiter::new(config.crawler.max_concurrent_fetches);

        Ok(Self {
            maintainer: IndexMaintainer::new(storage, lemmatizer),
            fetcher,
            limiter,
            control: CrawlControl::new(),
            config: Arc::new(config),
        })
    }

    /// Opens the configured database and creates a coordinator over it
    pub fn open(config: Config) -> Result<Self> {
        let storage = open_storage(Path::new(&config.output.database_path))?;
        Self::new(config, storage)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &SharedStorage {
        self.maintainer.storage()
    }

    /// Handle to the run flag, e.g. for a Ctrl-C handler
    pub fn control(&self) -> CrawlControl {
        self.control.clone()
    }

    pub fn is_indexing(&self) -> bool {
        self.control.is_running()
    }

    /// A search engine over the same storage and lemmatizer
    pub fn search_engine(&self) -> SearchEngine {
        SearchEngine::new(
            self.maintainer.storage().clone(),
            self.maintainer.lemmatizer().clone(),
        )
    }

    /// Runs a full crawl of every configured site and waits for it to end
    ///
    /// Fails with `AlreadyRunning` if a run is in progress. Per-site
    /// failures do not fail the run; they are recorded on the site.
    pub async fn start_crawl(&self) -> Result<()> {
        self.control.try_start()?;
        let result = self.run_all_sites().await;
        self.control.finish();
        result
    }

    /// Asks the running crawl to stop
    ///
    /// Fails with `NotRunning` if no crawl is in progress. In-flight fetches
    /// complete; nothing is persisted after they do.
    pub fn stop_crawl(&self) -> Result<()> {
        self.control.stop()?;
        tracing::warn!("{}", STOPPED_BY_USER);
        Ok(())
    }

    /// Fetches one page of a configured site and re-indexes it
    ///
    /// Fails with `OutOfScope` if no configured site owns the URL or it
    /// points to a binary resource the crawl would skip, and with
    /// `SiteBusy` if that site is being indexed. A failed fetch is stored on
    /// the page and marks the site FAILED with the fetch diagnostic.
    pub async fn index_single_page(&self, url: &str) -> Result<()> {
        let out_of_scope = || SearchError::OutOfScope {
            url: url.to_string(),
        };
        let target = normalize_link(url).map_err(|_| out_of_scope())?;
        if !LinkFilter::is_indexable_resource(&target) {
            return Err(out_of_scope());
        }
        let entry = self
            .config
            .site_for_url(&target)
            .ok_or_else(out_of_scope)?
            .clone();

        let site_id = with_storage(self.storage(), move |storage| {
            match storage.get_site_by_url(&entry.url)? {
                Some(site) if site.status == SiteStatus::Indexing => {
                    Err(SearchError::SiteBusy { url: entry.url })
                }
                Some(site) => {
                    storage.update_site_status(site.id, SiteStatus::Indexing, None)?;
                    Ok(site.id)
                }
                None => Ok(storage.insert_site(&entry.url, &entry.name, SiteStatus::Indexing)?),
            }
        })
        .await?;

        tracing::info!("Indexing single page {}", target);
        let page = {
            let _permit = self.limiter.acquire().await?;
            self.fetcher.fetch(&target).await
        };

        let stored = store_page(&self.maintainer, site_id, &page).await;

        let (status, last_error) = match (&stored, &page.error) {
            (Err(e), _) => (SiteStatus::Failed, Some(e.to_string())),
            (Ok(()), Some(message)) => (SiteStatus::Failed, Some(message.clone())),
            (Ok(()), None) => (SiteStatus::Indexed, None),
        };
        with_storage(self.storage(), move |storage| {
            Ok(storage.update_site_status(site_id, status, last_error.as_deref())?)
        })
        .await?;

        tracing::info!("Single page {} done: {}", target, status);
        stored
    }

    /// Totals and per-site breakdown of the index
    pub fn statistics(&self) -> Result<IndexStatistics> {
        let storage = lock_storage(self.storage())?;
        Ok(load_statistics(&*storage, self.control.is_running())?)
    }

    async fn run_all_sites(&self) -> Result<()> {
        let start_time = Instant::now();
        let crawls = self.prepare_sites().await?;
        tracing::info!("Starting crawl of {} sites", crawls.len());

        let mut tasks = JoinSet::new();
        for crawl in crawls {
            tasks.spawn(run_site(Arc::new(crawl)));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Site task aborted: {}", e);
            }
        }

        tracing::info!("Crawl run finished in {:?}", start_time.elapsed());
        Ok(())
    }

    /// Deletes previously stored data of every configured site, then
    /// creates fresh site rows in status INDEXING
    async fn prepare_sites(&self) -> Result<Vec<SiteCrawl>> {
        let mut roots = Vec::with_capacity(self.config.sites.len());
        for entry in &self.config.sites {
            let root = normalize_link(&entry.url)?;
            let filter = LinkFilter::for_site(&root)?;
            roots.push((root, filter));
        }

        let maintainer = self.maintainer.clone();
        let entries = self.config.sites.clone();
        let site_ids =
            tokio::task::spawn_blocking(move || register_sites(&maintainer, &entries)).await??;

        Ok(site_ids
            .into_iter()
            .zip(roots)
            .map(|(site_id, (root, filter))| SiteCrawl {
                site_id,
                root,
                filter,
                visited: VisitedSet::new(),
                fetcher: self.fetcher.clone(),
                limiter: self.limiter.clone(),
                control: self.control.clone(),
                maintainer: self.maintainer.clone(),
            })
            .collect())
    }
}

/// Resets every site that has stored data, then inserts one INDEXING row
/// per site, returning the new ids in configuration order
///
/// If an insert fails, the rows already created are marked FAILED with the
/// error so that no site is left INDEXING without a crawl task.
fn register_sites(maintainer: &IndexMaintainer, entries: &[SiteEntry]) -> Result<Vec<i64>> {
    for entry in entries {
        let existing = lock_storage(maintainer.storage())?.get_site_by_url(&entry.url)?;
        if let Some(site) = existing {
            maintainer.reset_site(site.id)?;
        }
    }

    let mut site_ids = Vec::with_capacity(entries.len());
    for entry in entries {
        let inserted = lock_storage(maintainer.storage())
            .and_then(|mut storage| {
                storage.insert_site(&entry.url, &entry.name, SiteStatus::Indexing)
            })
            .map_err(SearchError::from);

        match inserted {
            Ok(site_id) => site_ids.push(site_id),
            Err(e) => {
                tracing::error!("Could not register site {}: {}", entry.url, e);
                abandon_sites(maintainer.storage(), &site_ids, &e.to_string());
                return Err(e);
            }
        }
    }

    Ok(site_ids)
}

fn abandon_sites(storage: &SharedStorage, site_ids: &[i64], error: &str) {
    for &site_id in site_ids {
        let marked = lock_storage(storage)
            .and_then(|mut s| s.update_site_status(site_id, SiteStatus::Failed, Some(error)));
        if let Err(e) = marked {
            tracing::error!("Could not mark site {} failed: {}", site_id, e);
        }
    }
}

/// Runs storage work on the blocking pool under the storage lock
async fn with_storage<T, F>(storage: &SharedStorage, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn Storage) -> Result<T> + Send + 'static,
{
    let storage = Arc::clone(storage);
    tokio::task::spawn_blocking(move || {
        let mut guard = lock_storage(&storage)?;
        work(&mut *guard)
    })
    .await?
}

/// Crawls one site to completion and records the outcome on it
async fn run_site(crawl: Arc<SiteCrawl>) {
    let start_time = Instant::now();
    tracing::info!("Crawling {}", crawl.root);

    crawl.visited.claim(crawl.root.as_str());
    let outcome = crawl_page(Arc::clone(&crawl), crawl.root.clone()).await;

    let (status, last_error) = match &outcome {
        Ok(()) => (SiteStatus::Indexed, None),
        Err(SearchError::Cancelled) => (SiteStatus::Failed, Some(STOPPED_BY_USER.to_string())),
        Err(e) => (SiteStatus::Failed, Some(e.to_string())),
    };

    match &outcome {
        Ok(()) => tracing::info!(
            "Indexed {}: {} pages in {:?}",
            crawl.root,
            crawl.visited.claimed_count(),
            start_time.elapsed()
        ),
        Err(SearchError::Cancelled) => tracing::warn!("Crawl of {} stopped by user", crawl.root),
        Err(e) => tracing::error!("Crawl of {} failed: {}", crawl.root, e),
    }

    let site_id = crawl.site_id;
    let recorded = with_storage(crawl.maintainer.storage(), move |storage| {
        Ok(storage.update_site_status(site_id, status, last_error.as_deref())?)
    })
    .await;
    if let Err(e) = recorded {
        tracing::error!("Could not record status of {}: {}", crawl.root, e);
    }
}

/// Fetches and stores one page, then crawls its new links in parallel
///
/// The stop flag is checked before fetching and again before storing.
fn crawl_page(crawl: Arc<SiteCrawl>, url: Url) -> CrawlFuture {
    Box::pin(async move {
        if crawl.control.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let page = {
            let _permit = crawl.limiter.acquire().await?;
            crawl.fetcher.fetch(&url).await
        };

        if crawl.control.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        store_page(&crawl.maintainer, crawl.site_id, &page).await?;
        let site_id = crawl.site_id;
        with_storage(crawl.maintainer.storage(), move |storage| {
            Ok(storage.touch_site(site_id)?)
        })
        .await?;
        tracing::debug!("Stored {} ({})", url, page.status);

        let mut children = JoinSet::new();
        for link in page.links {
            if crawl.filter.should_follow(&link) && crawl.visited.claim(link.as_str()) {
                children.spawn(crawl_page(Arc::clone(&crawl), link));
            }
        }

        let mut outcome = Ok(());
        while let Some(joined) = children.join_next().await {
            let result = joined.map_err(SearchError::from).and_then(|r| r);
            outcome = merge_outcomes(outcome, result);
        }
        outcome
    })
}

/// Combines branch results: a stop wins over any other error, which wins
/// over success
fn merge_outcomes(current: Result<()>, next: Result<()>) -> Result<()> {
    match (current, next) {
        (Err(SearchError::Cancelled), _) | (_, Err(SearchError::Cancelled)) => {
            Err(SearchError::Cancelled)
        }
        (Err(e), _) => Err(e),
        (Ok(()), next) => next,
    }
}

/// Persists a fetched page through the index maintainer off the async runtime
async fn store_page(maintainer: &IndexMaintainer, site_id: i64, page: &FetchedPage) -> Result<()> {
    let maintainer = maintainer.clone();
    let path = page_path(&page.url);
    let code = page.status;
    let content = page.content().to_string();

    tokio::task::spawn_blocking(move || maintainer.index_page(site_id, &path, code, &content))
        .await??;
    Ok(())
}

//! Crawl runs, single-page indexing and run control against a mock site

use crate::common::*;
use lemmascope::storage::{lock_storage, Storage};
use lemmascope::{SearchError, SiteStatus, STOPPED_BY_USER};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_full_crawl_builds_index() {
    let server = MockServer::start().await;
    mount_site(&server, None).await;

    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));

    coordinator.start_crawl().await.expect("crawl should succeed");
    assert!(!coordinator.is_indexing());

    let site = site_record(&coordinator, &url);
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(site.last_error, None);

    // Lemma frequency counts pages, rank counts occurrences in one page
    assert_eq!(lemma_frequency(&coordinator, site.id, "привет"), Some(2));
    assert_eq!(page_rank(&coordinator, site.id, "/", "привет"), Some(2));
    assert_eq!(page_rank(&coordinator, site.id, "/about/", "привет"), Some(1));
    assert_eq!(page_rank(&coordinator, site.id, "/contact/", "привет"), None);

    let storage = lock_storage(coordinator.storage()).unwrap();
    // "/", "/about/", "/contact/" and the missing page
    assert_eq!(storage.count_pages(site.id).unwrap(), 4);
    assert!(storage.find_page(site.id, "/logo.png").unwrap().is_none());
    drop(storage);

    // Every path was requested exactly once and the logo never
    server.verify().await;
}

#[tokio::test]
async fn test_failed_fetch_is_stored_with_status() {
    let server = MockServer::start().await;
    mount_site(&server, None).await;

    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));
    coordinator.start_crawl().await.unwrap();

    let site = site_record(&coordinator, &url);
    // A dead link does not fail the site
    assert_eq!(site.status, SiteStatus::Indexed);

    let storage = lock_storage(coordinator.storage()).unwrap();
    let missing = storage
        .find_page(site.id, "/missing/")
        .unwrap()
        .expect("failed page should be stored");
    assert_eq!(missing.code, 404);
    assert!(missing.content.contains("404"));
    assert!(storage.indexes_for_page(missing.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_recrawl_resets_site() {
    let server = MockServer::start().await;
    mount_site(&server, None).await;

    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));
    coordinator.start_crawl().await.unwrap();
    let first = site_record(&coordinator, &url);

    server.reset().await;
    mount_site(&server, None).await;
    coordinator.start_crawl().await.unwrap();
    let second = site_record(&coordinator, &url);

    // The old site row and everything under it were replaced
    assert_ne!(first.id, second.id);
    assert_eq!(lemma_frequency(&coordinator, second.id, "привет"), Some(2));
    let storage = lock_storage(coordinator.storage()).unwrap();
    assert_eq!(storage.list_sites().unwrap().len(), 1);
    assert_eq!(storage.count_pages(first.id).unwrap(), 0);
}

#[tokio::test]
async fn test_index_single_page_refreshes_counts() {
    let server = MockServer::start().await;
    mount_site(&server, None).await;

    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));
    coordinator.start_crawl().await.unwrap();

    // The home page no longer greets anyone
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "<html><head><title>Главная</title></head><body><p>Тихий мир.</p></body></html>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    coordinator
        .index_single_page(&url)
        .await
        .expect("single page indexing should succeed");

    let site = site_record(&coordinator, &url);
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(lemma_frequency(&coordinator, site.id, "привет"), Some(1));
    assert_eq!(page_rank(&coordinator, site.id, "/", "привет"), None);
    assert_eq!(page_rank(&coordinator, site.id, "/about/", "привет"), Some(1));
    assert_eq!(page_rank(&coordinator, site.id, "/", "мир"), Some(1));

    server.verify().await;
}

#[tokio::test]
async fn test_index_single_page_creates_site() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about/"))
        .respond_with(html(ABOUT))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));

    coordinator
        .index_single_page(&format!("{}about", url))
        .await
        .unwrap();

    let site = site_record(&coordinator, &url);
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(page_rank(&coordinator, site.id, "/about/", "привет"), Some(1));
}

#[tokio::test]
async fn test_index_single_page_fetch_failure_marks_site_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));

    coordinator
        .index_single_page(&format!("{}missing/", url))
        .await
        .expect("a failed fetch is recorded, not returned");

    let site = site_record(&coordinator, &url);
    assert_eq!(site.status, SiteStatus::Failed);
    assert!(site.last_error.unwrap_or_default().contains("404"));

    let storage = lock_storage(coordinator.storage()).unwrap();
    let page = storage.find_page(site.id, "/missing/").unwrap().unwrap();
    assert_eq!(page.code, 404);
}

#[tokio::test]
async fn test_index_single_page_out_of_scope() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));

    let result = coordinator
        .index_single_page("https://elsewhere.test/page/")
        .await;
    assert!(matches!(result, Err(SearchError::OutOfScope { .. })));

    let result = coordinator.index_single_page("not a url").await;
    assert!(matches!(result, Err(SearchError::OutOfScope { .. })));

    // No state change
    let storage = lock_storage(coordinator.storage()).unwrap();
    assert!(storage.list_sites().unwrap().is_empty());
}

#[tokio::test]
async fn test_index_single_page_rejects_binary_resources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 16], "application/pdf"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));

    let result = coordinator
        .index_single_page(&format!("{}report.pdf", url))
        .await;
    assert!(matches!(result, Err(SearchError::OutOfScope { .. })));

    // Nothing was fetched and no site row was created
    let storage = lock_storage(coordinator.storage()).unwrap();
    assert!(storage.list_sites().unwrap().is_empty());
    drop(storage);
    server.verify().await;
}

#[tokio::test]
async fn test_index_single_page_rejected_while_site_indexing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));

    lock_storage(coordinator.storage())
        .unwrap()
        .insert_site(&url, "Example", SiteStatus::Indexing)
        .unwrap();

    let result = coordinator.index_single_page(&url).await;
    assert!(matches!(result, Err(SearchError::SiteBusy { .. })));
    assert_eq!(site_record(&coordinator, &url).status, SiteStatus::Indexing);
}

#[tokio::test]
async fn test_stop_crawl_marks_site_failed() {
    let server = MockServer::start().await;
    mount_site(&server, Some(Duration::from_millis(800))).await;

    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));

    let runner = coordinator.clone();
    let crawl = tokio::spawn(async move { runner.start_crawl().await });

    // The home page is stored quickly; its children are still in flight
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(coordinator.is_indexing());
    coordinator.stop_crawl().expect("stop should be accepted");

    crawl.await.unwrap().expect("a stopped run still completes");
    assert!(!coordinator.is_indexing());

    let site = site_record(&coordinator, &url);
    assert_eq!(site.status, SiteStatus::Failed);
    assert_eq!(site.last_error.as_deref(), Some(STOPPED_BY_USER));

    // Fetches in flight completed, but nothing was persisted after the stop
    let storage = lock_storage(coordinator.storage()).unwrap();
    assert!(storage.find_page(site.id, "/").unwrap().is_some());
    assert!(storage.find_page(site.id, "/about/").unwrap().is_none());
    assert!(storage.find_page(site.id, "/contact/").unwrap().is_none());
}

#[tokio::test]
async fn test_run_control_conflicts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOME).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));

    assert!(matches!(coordinator.stop_crawl(), Err(SearchError::NotRunning)));

    let runner = coordinator.clone();
    let crawl = tokio::spawn(async move { runner.start_crawl().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(matches!(
        coordinator.start_crawl().await,
        Err(SearchError::AlreadyRunning)
    ));

    coordinator.stop_crawl().unwrap();
    crawl.await.unwrap().unwrap();

    // The flag is cleared at run end, so stopping again is rejected
    assert!(matches!(coordinator.stop_crawl(), Err(SearchError::NotRunning)));
}

#[tokio::test]
async fn test_statistics_after_crawl() {
    let server = MockServer::start().await;
    mount_site(&server, None).await;

    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));
    coordinator.start_crawl().await.unwrap();

    let stats = coordinator.statistics().unwrap();
    assert_eq!(stats.sites, 1);
    assert_eq!(stats.pages, 4);
    assert!(stats.lemmas > 0);
    assert!(!stats.indexing);
    assert_eq!(stats.detailed[0].url, url);
    assert_eq!(stats.detailed[0].status, SiteStatus::Indexed);
}

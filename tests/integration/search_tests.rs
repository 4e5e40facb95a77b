//! Searching a crawled mock site

use crate::common::*;
use lemmascope::SearchResult;
use tempfile::TempDir;
use wiremock::MockServer;

async fn crawled_site() -> (MockServer, TempDir, lemmascope::Coordinator, String) {
    let server = MockServer::start().await;
    mount_site(&server, None).await;

    let dir = TempDir::new().unwrap();
    let url = site_url(&server);
    let coordinator = open_coordinator(&url, &dir.path().join("index.db"));
    coordinator.start_crawl().await.expect("crawl should succeed");

    (server, dir, coordinator, url)
}

#[tokio::test]
async fn test_search_ranks_by_normalized_relevance() {
    let (_server, _dir, coordinator, url) = crawled_site().await;

    let response = coordinator
        .search_engine()
        .search("привет", None, 0, 20)
        .unwrap();

    assert_eq!(response.count, 2);
    let paths: Vec<&str> = response.results.iter().map(|r| r.uri.as_str()).collect();
    assert_eq!(paths, vec!["/", "/about/"]);
    assert_eq!(response.results[0].relevance, 1.0);
    assert_eq!(response.results[1].relevance, 0.5);

    let top = &response.results[0];
    assert_eq!(top.site, url);
    assert_eq!(top.site_name, "Example");
    assert_eq!(top.title, "Главная");
    assert!(top.snippet.contains("<b>Привет</b>"));
    assert!(top.snippet.ends_with("..."));
}

#[tokio::test]
async fn test_search_intersects_query_lemmas() {
    let (_server, _dir, coordinator, _url) = crawled_site().await;
    let engine = coordinator.search_engine();

    // Only the home page has both words
    let response = engine.search("привет мир", None, 0, 20).unwrap();
    assert_eq!(response.count, 1);
    assert_eq!(response.results[0].uri, "/");

    // A word the site never uses contributes nothing
    let response = engine.search("привет зебра", None, 0, 20).unwrap();
    assert_eq!(response.count, 2);

    // Function words and unknown words alone yield an empty success
    assert_eq!(engine.search("и", None, 0, 20).unwrap().count, 0);
    assert_eq!(engine.search("зебра", None, 0, 20).unwrap().count, 0);
}

#[tokio::test]
async fn test_search_pagination() {
    let (_server, _dir, coordinator, _url) = crawled_site().await;
    let engine = coordinator.search_engine();

    let full = engine.search("привет", None, 0, 20).unwrap();
    let mut paged: Vec<SearchResult> = Vec::new();
    for offset in 0..full.count {
        let page = engine.search("привет", None, offset, 1).unwrap();
        assert!(page.results.len() <= 1);
        assert_eq!(page.count, full.count);
        paged.extend(page.results);
    }
    assert_eq!(paged, full.results);

    let beyond = engine.search("привет", None, 10, 20).unwrap();
    assert_eq!(beyond.count, 2);
    assert!(beyond.results.is_empty());
}

#[tokio::test]
async fn test_search_site_filter() {
    let (_server, _dir, coordinator, url) = crawled_site().await;
    let engine = coordinator.search_engine();

    let own = engine
        .search("привет", Some(url.trim_end_matches('/')), 0, 20)
        .unwrap();
    assert_eq!(own.count, 2);

    let other = engine
        .search("привет", Some("https://other.test/"), 0, 20)
        .unwrap();
    assert_eq!(other.count, 0);
}

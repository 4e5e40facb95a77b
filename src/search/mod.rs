//! Search over the lemma index
//!
//! A query is reduced to its lemmas. Within every searchable site the
//! resolved lemmas are taken rarest first and the candidate pages are
//! narrowed lemma by lemma. Surviving pages are ranked by the sum of their
//! ranks, normalized by the best page, and paginated.

mod snippet;

pub use snippet::{build_snippet, CONTEXT_BUDGET, MIN_CONTEXT};

use crate::crawler::{extract_text, extract_title};
use crate::lemma::Lemmatizer;
use crate::state::SiteStatus;
use crate::storage::{lock_storage, IndexRecord, LemmaRecord, PageRecord, SharedStorage, SiteRecord, Storage};
use crate::Result;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Default page size for callers that do not pass one
pub const DEFAULT_LIMIT: usize = 20;

/// One ranked page
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Root URL of the page's site
    pub site: String,
    pub site_name: String,
    /// Site-relative path of the page
    pub uri: String,
    pub title: String,
    pub snippet: String,
    /// Relevance in (0, 1]; the best page scores 1.0
    pub relevance: f64,
}

/// A page of results plus the total number of matching pages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub count: usize,
    pub results: Vec<SearchResult>,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A page that survived the intersection, before presentation
struct ScoredPage {
    page: PageRecord,
    site: Arc<SiteRecord>,
    relevance: f64,
}

/// Read path over the index
#[derive(Clone)]
pub struct SearchEngine {
    storage: SharedStorage,
    lemmatizer: Arc<Lemmatizer>,
}

impl SearchEngine {
    pub fn new(storage: SharedStorage, lemmatizer: Arc<Lemmatizer>) -> Self {
        Self {
            storage,
            lemmatizer,
        }
    }

    /// Runs a query
    ///
    /// Only sites in status INDEXED are searched, optionally just the one
    /// whose root URL is `site`. Returns at most `limit` results starting at
    /// `offset` in relevance order; `count` is the number of matching pages
    /// before pagination. A query without known lemmas yields an empty
    /// response, not an error.
    pub fn search(
        &self,
        query: &str,
        site: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResponse> {
        let query_lemmas = self.lemmatizer.lemma_set(query);
        if query_lemmas.is_empty() {
            tracing::debug!("Query '{}' has no lemmas", query);
            return Ok(SearchResponse::empty());
        }

        let mut lemmas: Vec<&String> = query_lemmas.iter().collect();
        lemmas.sort();

        let mut scored = {
            let storage = lock_storage(&self.storage)?;
            let sites = searchable_sites(&*storage, site)?;
            let mut scored = Vec::new();
            for site in sites {
                scored.extend(score_site(&*storage, site, &lemmas)?);
            }
            scored
        };

        if scored.is_empty() {
            return Ok(SearchResponse::empty());
        }

        let max = scored
            .iter()
            .map(|s| s.relevance)
            .fold(f64::MIN, f64::max);
        if max > 0.0 {
            for page in &mut scored {
                page.relevance /= max;
            }
        }

        scored.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.site.url.cmp(&b.site.url))
                .then_with(|| a.page.path.cmp(&b.page.path))
        });

        let count = scored.len();
        let results = scored
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|scored| self.present(scored, &query_lemmas))
            .collect();

        Ok(SearchResponse { count, results })
    }

    fn present(&self, scored: ScoredPage, query_lemmas: &HashSet<String>) -> SearchResult {
        let text = extract_text(&scored.page.content);
        SearchResult {
            site: scored.site.url.clone(),
            site_name: scored.site.name.clone(),
            uri: scored.page.path,
            title: extract_title(&scored.page.content).unwrap_or_default(),
            snippet: build_snippet(&text, query_lemmas, &self.lemmatizer),
            relevance: scored.relevance,
        }
    }
}

/// Sites whose index is complete, optionally narrowed to one root URL
fn searchable_sites(storage: &dyn Storage, filter: Option<&str>) -> Result<Vec<SiteRecord>> {
    let sites = storage
        .list_sites()?
        .into_iter()
        .filter(|site| site.status == SiteStatus::Indexed)
        .filter(|site| filter.map_or(true, |url| same_site_url(&site.url, url)))
        .collect();
    Ok(sites)
}

fn same_site_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/').eq_ignore_ascii_case(b.trim_end_matches('/'))
}

/// Intersects candidate pages of one site and scores the survivors
fn score_site(storage: &dyn Storage, site: SiteRecord, lemmas: &[&String]) -> Result<Vec<ScoredPage>> {
    let mut resolved: Vec<LemmaRecord> = Vec::new();
    for lemma in lemmas {
        if let Some(record) = storage.find_lemma(site.id, lemma)? {
            if record.frequency > 0 {
                resolved.push(record);
            }
        }
    }
    if resolved.is_empty() {
        return Ok(Vec::new());
    }

    // rarest first keeps the candidate set small from the start
    resolved.sort_by(|a, b| a.frequency.cmp(&b.frequency).then_with(|| a.lemma.cmp(&b.lemma)));

    let mut encountered: Vec<IndexRecord> = storage.indexes_for_lemma(resolved[0].id)?;
    let mut candidates: Vec<i64> = encountered.iter().map(|row| row.page_id).collect();

    for lemma in &resolved[1..] {
        if candidates.is_empty() {
            break;
        }
        let rows = storage.indexes_for_lemma_in_pages(lemma.id, &candidates)?;
        candidates = rows.iter().map(|row| row.page_id).collect();
        encountered.extend(rows);
    }

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let surviving: HashSet<i64> = candidates.iter().copied().collect();
    let mut absolute: HashMap<i64, i64> = HashMap::new();
    for row in encountered.iter().filter(|row| surviving.contains(&row.page_id)) {
        *absolute.entry(row.page_id).or_insert(0) += row.rank;
    }

    let site = Arc::new(site);
    let pages = storage.get_pages(&candidates)?;
    Ok(pages
        .into_iter()
        .map(|page| ScoredPage {
            relevance: absolute.get(&page.id).copied().unwrap_or(0) as f64,
            site: Arc::clone(&site),
            page,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexMaintainer;
    use crate::lemma::Language;
    use crate::storage::SqliteStorage;
    use std::sync::Mutex;

    const HOME: &str = "<html><head><title>Главная</title></head><body><p>Привет, привет мир!</p></body></html>";
    const ABOUT: &str = "<html><head><title>О нас</title></head><body><p>Привет от команды.</p></body></html>";
    const CONTACT: &str = "<html><head><title>Контакты</title></head><body><p>Пишите письма.</p></body></html>";

    struct Fixture {
        engine: SearchEngine,
        maintainer: IndexMaintainer,
        site_id: i64,
    }

    fn fixture() -> Fixture {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let site_id = storage
            .insert_site("https://example.test/", "Example", SiteStatus::Indexing)
            .unwrap();
        let shared: SharedStorage = Arc::new(Mutex::new(storage));
        let lemmatizer = Arc::new(Lemmatizer::new(&[Language::Russian, Language::English]));

        let maintainer = IndexMaintainer::new(shared.clone(), lemmatizer.clone());
        maintainer.index_page(site_id, "/", 200, HOME).unwrap();
        maintainer.index_page(site_id, "/about/", 200, ABOUT).unwrap();
        maintainer.index_page(site_id, "/contact/", 200, CONTACT).unwrap();
        set_status(&shared, site_id, SiteStatus::Indexed);

        Fixture {
            engine: SearchEngine::new(shared, lemmatizer),
            maintainer,
            site_id,
        }
    }

    fn set_status(storage: &SharedStorage, site_id: i64, status: SiteStatus) {
        lock_storage(storage)
            .unwrap()
            .update_site_status(site_id, status, None)
            .unwrap();
    }

    #[test]
    fn test_ranked_and_normalized() {
        let fixture = fixture();
        let response = fixture.engine.search("привет", None, 0, 20).unwrap();

        assert_eq!(response.count, 2);
        assert_eq!(response.results[0].uri, "/");
        assert_eq!(response.results[0].relevance, 1.0);
        assert_eq!(response.results[1].uri, "/about/");
        assert_eq!(response.results[1].relevance, 0.5);

        let first = &response.results[0];
        assert_eq!(first.site, "https://example.test/");
        assert_eq!(first.site_name, "Example");
        assert_eq!(first.title, "Главная");
        assert!(first.snippet.contains("<b>Привет</b>"));
        assert!(first.snippet.ends_with(" ..."));
    }

    #[test]
    fn test_all_lemmas_required() {
        let fixture = fixture();
        let response = fixture.engine.search("привет мир", None, 0, 20).unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].uri, "/");
        assert_eq!(response.results[0].relevance, 1.0);
    }

    #[test]
    fn test_unknown_lemma_contributes_nothing() {
        let fixture = fixture();
        let response = fixture.engine.search("привет зебра", None, 0, 20).unwrap();
        assert_eq!(response.count, 2);
    }

    #[test]
    fn test_empty_queries() {
        let fixture = fixture();
        assert_eq!(fixture.engine.search("", None, 0, 20).unwrap(), SearchResponse::empty());
        assert_eq!(fixture.engine.search("и в на", None, 0, 20).unwrap().count, 0);
        assert_eq!(fixture.engine.search("зебра", None, 0, 20).unwrap().count, 0);
    }

    #[test]
    fn test_empty_intersection() {
        let fixture = fixture();
        let response = fixture.engine.search("мир письма", None, 0, 20).unwrap();
        assert_eq!(response.count, 0);
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_pagination() {
        let fixture = fixture();
        let full = fixture.engine.search("привет", None, 0, 20).unwrap();

        let first = fixture.engine.search("привет", None, 0, 1).unwrap();
        let second = fixture.engine.search("привет", None, 1, 1).unwrap();
        let beyond = fixture.engine.search("привет", None, 5, 10).unwrap();

        assert_eq!(first.results.len(), 1);
        assert_eq!(first.count, 2);
        assert_eq!(second.results.len(), 1);
        assert_eq!(beyond.count, 2);
        assert!(beyond.results.is_empty());

        let stitched: Vec<SearchResult> = first.results.into_iter().chain(second.results).collect();
        assert_eq!(stitched, full.results);
    }

    #[test]
    fn test_only_indexed_sites_searched() {
        let fixture = fixture();
        set_status(fixture.engine_storage(), fixture.site_id, SiteStatus::Indexing);
        assert_eq!(fixture.engine.search("привет", None, 0, 20).unwrap().count, 0);
    }

    #[test]
    fn test_site_filter() {
        let fixture = fixture();
        let matching = fixture
            .engine
            .search("привет", Some("https://example.test"), 0, 20)
            .unwrap();
        assert_eq!(matching.count, 2);

        let other = fixture
            .engine
            .search("привет", Some("https://other.test/"), 0, 20)
            .unwrap();
        assert_eq!(other.count, 0);
    }

    #[test]
    fn test_refresh_changes_results() {
        let fixture = fixture();
        fixture
            .maintainer
            .index_page(fixture.site_id, "/", 200, "<html><body>Мир</body></html>")
            .unwrap();

        let response = fixture.engine.search("привет", None, 0, 20).unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].uri, "/about/");
        assert_eq!(response.results[0].relevance, 1.0);
    }

    impl Fixture {
        fn engine_storage(&self) -> &SharedStorage {
            &self.engine.storage
        }
    }
}

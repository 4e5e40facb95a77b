//! Shared fixtures: a three-page Russian site and a configuration pointing at it

use lemmascope::config::{parse_config, Config};
use lemmascope::storage::{lock_storage, SiteRecord, Storage};
use lemmascope::{Coordinator, Language, Lemmatizer};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const HOME: &str = r##"<html>
<head><title>Главная</title></head>
<body>
  <p>Привет, привет мир!</p>
  <a href="/about">О нас</a>
  <a href="/about/#team">Команда</a>
  <a href="/contact/">Контакты</a>
  <a href="/logo.png">Логотип</a>
  <a href="https://other.test/page/">Партнёры</a>
  <a href="mailto:info@example.test">Почта</a>
</body>
</html>"##;

pub const ABOUT: &str = r##"<html>
<head><title>О нас</title></head>
<body>
  <p>Привет от команды.</p>
  <a href="/">Главная</a>
  <a href="/contact/">Контакты</a>
</body>
</html>"##;

pub const CONTACT: &str = r##"<html>
<head><title>Контакты</title></head>
<body>
  <p>Пишите письма.</p>
  <a href="/">Главная</a>
  <a href="/missing/">Архив</a>
</body>
</html>"##;

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

/// Mounts the three pages, a missing page and a logo
///
/// Without a delay every page expects exactly one request and the logo
/// none. Delayed pages may be stopped before they are requested, so they
/// carry no expectations.
pub async fn mount_site(server: &MockServer, page_delay: Option<Duration>) {
    let strict = page_delay.is_none();
    let delayed = |template: ResponseTemplate| match page_delay {
        Some(delay) => template.set_delay(delay),
        None => template,
    };

    mount_page(server, "/", html(HOME), strict).await;
    mount_page(server, "/about/", delayed(html(ABOUT)), strict).await;
    mount_page(server, "/contact/", delayed(html(CONTACT)), strict).await;

    Mock::given(method("GET"))
        .and(path("/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 16], "image/png"))
        .expect(0)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, route: &str, template: ResponseTemplate, strict: bool) {
    let mock = Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template);
    let mock = if strict { mock.expect(1) } else { mock };
    mock.mount(server).await;
}

pub fn site_url(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

pub fn test_config(site_url: &str, database: &Path) -> Config {
    let content = format!(
        r#"
[connection]
user-agent = "LemmascopeTestBot/1.0"
referer = "https://www.google.com"
timeout-ms = 5000
politeness-delay-ms = 0

[crawler]
max-concurrent-fetches = 4

[lemmatizer]
languages = ["russian", "english"]

[output]
database-path = '{}'

[[sites]]
url = "{}"
name = "Example"
"#,
        database.display(),
        site_url
    );
    parse_config(&content).expect("test config should be valid")
}

pub fn open_coordinator(site_url: &str, database: &Path) -> Coordinator {
    Coordinator::open(test_config(site_url, database)).expect("Failed to open coordinator")
}

/// Lemma the index stores for a Russian word
pub fn lemma(word: &str) -> String {
    Lemmatizer::new(&[Language::Russian])
        .lemma_of(word)
        .expect("word should have a lemma")
}

pub fn site_record(coordinator: &Coordinator, url: &str) -> SiteRecord {
    lock_storage(coordinator.storage())
        .unwrap()
        .get_site_by_url(url)
        .unwrap()
        .expect("site should be stored")
}

pub fn lemma_frequency(coordinator: &Coordinator, site_id: i64, word: &str) -> Option<i64> {
    lock_storage(coordinator.storage())
        .unwrap()
        .find_lemma(site_id, &lemma(word))
        .unwrap()
        .map(|l| l.frequency)
}

/// Rank of a word's lemma on the page at `page_path`, if indexed there
pub fn page_rank(coordinator: &Coordinator, site_id: i64, page_path: &str, word: &str) -> Option<i64> {
    let storage = lock_storage(coordinator.storage()).unwrap();
    let page = storage.find_page(site_id, page_path).unwrap()?;
    let lemma = storage.find_lemma(site_id, &lemma(word)).unwrap()?;
    storage
        .indexes_for_page(page.id)
        .unwrap()
        .into_iter()
        .find(|index| index.lemma_id == lemma.id)
        .map(|index| index.rank)
}

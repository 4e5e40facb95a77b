use crate::lemma::Language;
use crate::url::registered_host;
use serde::Deserialize;
use url::Url;

/// Main configuration structure for Lemmascope
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub lemmatizer: LemmatizerConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

impl Config {
    /// Finds the configured site that owns `url`, matching by normalized host
    /// (lowercased, `www.` stripped) and explicit port.
    pub fn site_for_url(&self, url: &Url) -> Option<&SiteEntry> {
        let host = registered_host(url)?;
        self.sites.iter().find(|site| {
            Url::parse(&site.url)
                .ok()
                .filter(|root| root.port() == url.port())
                .and_then(|root| registered_host(&root))
                .is_some_and(|root_host| root_host == host)
        })
    }

    /// Returns the configured site URLs in declaration order
    pub fn site_urls(&self) -> Vec<&str> {
        self.sites.iter().map(|site| site.url.as_str()).collect()
    }

    /// Languages the lemmatizer should be built for
    pub fn languages(&self) -> &[Language] {
        &self.lemmatizer.languages
    }
}

/// HTTP connection settings shared by every fetch
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Referer header sent with every request
    pub referer: String,

    /// Connect + read timeout for a single fetch (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause before every fetch (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight per crawl run
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LemmatizerConfig {
    #[serde(default = "default_languages")]
    pub languages: Vec<Language>,
}

impl Default for LemmatizerConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A site to crawl and search
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Root URL of the site (e.g., "https://example.com/")
    pub url: String,

    /// Human-readable site name
    pub name: String,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_politeness_delay_ms() -> u64 {
    150
}

fn default_max_concurrent_fetches() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_languages() -> Vec<Language> {
    vec![Language::Russian, Language::English]
}

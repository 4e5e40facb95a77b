//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent, referer and timeout
//! - The politeness delay before every request
//! - Mapping failed fetches to a fixed status-code taxonomy
//!
//! The fetcher never retries; a failure is reported once through the page's
//! status code and the caller decides what to do with it.

use crate::config::ConnectionConfig;
use crate::crawler::parser::parse_html;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, REFERER};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::error::Error as StdError;
use std::time::Duration;
use url::Url;

/// Content types accepted as pages
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Why a fetch did not produce a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    Unauthorized,
    Forbidden,
    NotFound,
    /// The response was not HTML
    UnsupportedMedia,
    ServerError,
    ServiceUnavailable,
    UnknownHost,
    /// Recorded as a server error
    ConnectionRefused,
    TlsHandshake,
    /// Timeouts and everything else
    Unknown,
}

impl FetchFailure {
    /// Status code stored on the page for this failure
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::UnsupportedMedia => 415,
            Self::ServerError | Self::ConnectionRefused => 500,
            Self::ServiceUnavailable => 503,
            Self::UnknownHost => 523,
            Self::TlsHandshake => 525,
            Self::Unknown => -1,
        }
    }

    /// Maps a non-success HTTP status to the taxonomy
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            415 => Self::UnsupportedMedia,
            503 => Self::ServiceUnavailable,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Classifies a transport error by walking its source chain
    ///
    /// Only the sources are inspected: the top-level reqwest message embeds
    /// the request URL, whose text must not decide the outcome.
    pub fn from_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Unknown;
        }

        let mut source = error.source();
        while let Some(err) = source {
            if let Some(failure) = Self::from_source(err) {
                return failure;
            }
            source = err.source();
        }

        if error.is_connect() {
            Self::ConnectionRefused
        } else {
            Self::Unknown
        }
    }

    fn from_source(err: &(dyn StdError + 'static)) -> Option<Self> {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return Some(Self::ConnectionRefused);
            }
        }

        let message = err.to_string().to_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
            || message.contains("no such host")
        {
            Some(Self::UnknownHost)
        } else if message.contains("connection refused") {
            Some(Self::ConnectionRefused)
        } else if message.contains("certificate")
            || message.contains("handshake")
            || message.contains("tls")
        {
            Some(Self::TlsHandshake)
        } else {
            None
        }
    }
}

/// Outcome of fetching one URL
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: Url,

    /// HTTP status, or the taxonomy code of the failure
    pub status: i32,

    /// Page markup; empty on failure
    pub body: String,

    /// Outbound links; always empty on failure
    pub links: Vec<Url>,

    /// Diagnostic message when the fetch failed
    pub error: Option<String>,
}

impl FetchedPage {
    fn failed(url: &Url, failure: FetchFailure, message: String) -> Self {
        Self {
            url: url.clone(),
            status: failure.status_code(),
            body: String::new(),
            links: Vec::new(),
            error: Some(message),
        }
    }

    /// True when the page was fetched with a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// What gets stored as the page content: markup, or the diagnostic
    pub fn content(&self) -> &str {
        match &self.error {
            Some(message) => message,
            None => &self.body,
        }
    }
}

/// Builds an HTTP client with the configured identity
///
/// # Example
///
/// ```
/// use lemmascope::config::ConnectionConfig;
/// use lemmascope::crawler::build_http_client;
///
/// let config = ConnectionConfig {
///     user_agent: "LemmascopeBot/1.0".to_string(),
///     referer: "https://www.google.com".to_string(),
///     timeout_ms: 10_000,
///     politeness_delay_ms: 150,
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &ConnectionConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if let Ok(referer) = HeaderValue::from_str(&config.referer) {
        headers.insert(REFERER, referer);
    }

    let timeout = Duration::from_millis(config.timeout_ms);

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages one request at a time, honoring the politeness delay
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    politeness_delay: Duration,
}

impl Fetcher {
    pub fn new(config: &ConnectionConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            politeness_delay: Duration::from_millis(config.politeness_delay_ms),
        })
    }

    /// Sleeps for the politeness delay, then GETs the URL
    ///
    /// | Outcome | Status stored |
    /// |---------|---------------|
    /// | 2xx HTML | the HTTP status |
    /// | 401 / 403 / 404 / 503 | the HTTP status |
    /// | other 5xx, connection refused | 500 |
    /// | non-HTML content type | 415 |
    /// | unknown host | 523 |
    /// | TLS handshake failure | 525 |
    /// | timeout, anything else | -1 |
    pub async fn fetch(&self, url: &Url) -> FetchedPage {
        if !self.politeness_delay.is_zero() {
            tokio::time::sleep(self.politeness_delay).await;
        }

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                let failure = FetchFailure::from_error(&e);
                tracing::warn!("Fetch of {} failed ({:?}): {}", url, failure, e);
                return FetchedPage::failed(url, failure, e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let failure = FetchFailure::from_status(status);
            tracing::debug!("{} answered {}", url, status);
            return FetchedPage::failed(url, failure, format!("HTTP status {}", status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        if let Some(content_type) = &content_type {
            if !HTML_CONTENT_TYPES.iter().any(|t| content_type.contains(t)) {
                return FetchedPage::failed(
                    url,
                    FetchFailure::UnsupportedMedia,
                    format!("Unsupported content type: {}", content_type),
                );
            }
        }

        let final_url = response.url().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let failure = FetchFailure::from_error(&e);
                tracing::warn!("Reading body of {} failed: {}", url, e);
                return FetchedPage::failed(url, failure, e.to_string());
            }
        };

        let links = parse_html(&body, &final_url).links;

        FetchedPage {
            url: url.clone(),
            status: status.as_u16() as i32,
            body,
            links,
            error: None,
        }
    }
}

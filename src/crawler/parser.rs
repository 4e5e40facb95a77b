//! HTML handling for fetched pages
//!
//! This module extracts from page markup:
//! - Outbound links (absolute, normalized, deduplicated)
//! - The page title
//! - Visible text, used both for lemmatization and for snippets

use crate::url::normalize_link;
use scraper::{Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose text is never shown to a reader
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from the <title> tag)
    pub title: Option<String>,

    /// Normalized absolute links, in document order, without duplicates
    pub links: Vec<Url>,
}

/// Parses page markup and extracts its title and links
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` anywhere in the document, resolved against
/// `base_url` and normalized (fragment dropped, directory paths get a
/// trailing slash).
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links (same-page anchors)
/// - Anything that is not HTTP(S) after resolution
///
/// # Example
///
/// ```
/// use lemmascope::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page/");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: title_of(&document),
        links: links_of(&document, base_url),
    }
}

/// Extracts the page title from markup
pub fn extract_title(html: &str) -> Option<String> {
    title_of(&Html::parse_document(html))
}

/// Extracts the visible text of a page with whitespace collapsed
///
/// Text inside `script`, `style`, `noscript` and `template` is dropped. When
/// the document has a body, only the body is read.
///
/// ```
/// use lemmascope::crawler::extract_text;
///
/// let html = "<html><head><title>T</title><style>p{}</style></head>\
///             <body><p>Hello\n   <b>world</b></p><script>var x;</script></body></html>";
/// assert_eq!(extract_text(html), "Hello world");
/// ```
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next());

    let mut pieces: Vec<&str> = Vec::new();
    let root = match body {
        Some(body) => *body,
        None => document.tree.root(),
    };

    for node in root.descendants() {
        let text = match node.value() {
            Node::Text(text) => &**text,
            _ => continue,
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| INVISIBLE_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            pieces.push(text);
        }
    }

    pieces
        .iter()
        .flat_map(|piece| piece.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_of(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| {
            element
                .text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|s| !s.is_empty())
}

fn links_of(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let a_selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return links,
    };

    for element in document.select(&a_selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let resolved = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url));

        if let Some(url) = resolved {
            if seen.insert(url.as_str().to_string()) {
                links.push(url);
            }
        }
    }

    links
}

/// Resolves an href to a normalized absolute URL
///
/// Returns None for special schemes, same-page anchors and anything that
/// does not normalize to an HTTP(S) URL.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_link(absolute.as_str()).ok()
}

use crate::UrlError;
use url::Url;

/// Query parameters that never change page content
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "yclid", "mc_eid"];

/// Normalizes a discovered link so the same page always maps to one URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Drop the fragment (everything after #)
/// 3. Drop tracking query parameters (`utm_*`, click ids); drop an empty query
/// 4. Add a trailing slash to directory-like paths, i.e. when the last path
///    segment has no file extension (`/about` becomes `/about/`)
///
/// Hosts are lowercased by the URL parser itself.
///
/// # Examples
///
/// ```
/// use lemmascope::url::normalize_link;
///
/// let url = normalize_link("https://Example.com/about#team").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about/");
/// ```
pub fn normalize_link(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    let path = url.path().to_string();
    if needs_trailing_slash(&path) {
        url.set_path(&format!("{}/", path));
    }

    Ok(url)
}

/// Returns the site-relative path stored for a page: path plus query, if any
///
/// ```
/// use url::Url;
/// use lemmascope::url::page_path;
///
/// let url = Url::parse("https://example.com/news/?page=2").unwrap();
/// assert_eq!(page_path(&url), "/news/?page=2");
/// ```
pub fn page_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn needs_trailing_slash(path: &str) -> bool {
    if path.ends_with('/') {
        return false;
    }
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    !last_segment.contains('.')
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_trailing_slash() {
        let url = normalize_link("https://example.com/about").unwrap();
        assert_eq!(url.as_str(), "https://example.com/about/");
    }

    #[test]
    fn test_keeps_file_paths() {
        let url = normalize_link("https://example.com/docs/page.html").unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/page.html");
    }

    #[test]
    fn test_root_unchanged() {
        let url = normalize_link("https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_remove_fragment() {
        let url = normalize_link("https://example.com/page/#section").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page/");
    }

    #[test]
    fn test_remove_tracking_params() {
        let url = normalize_link("https://example.com/page/?utm_source=mail&fbclid=1").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page/");

        let url = normalize_link("https://example.com/page/?id=7&utm_medium=x").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page/?id=7");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            normalize_link("ftp://example.com/file"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(normalize_link("not a url").is_err());
    }

    #[test]
    fn test_page_path() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(page_path(&url), "/");

        let url = Url::parse("https://example.com/contact/").unwrap();
        assert_eq!(page_path(&url), "/contact/");
    }
}

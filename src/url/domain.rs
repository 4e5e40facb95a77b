use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use lemmascope::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the host a site is identified by: lowercase, without a leading `www.`
///
/// `https://www.example.com/` and `https://example.com/` both resolve to
/// `example.com`, so a page URL can be matched to its configured site no matter
/// which of the two forms either side uses.
///
/// ```
/// use url::Url;
/// use lemmascope::url::registered_host;
///
/// let url = Url::parse("https://www.Example.com/news/").unwrap();
/// assert_eq!(registered_host(&url), Some("example.com".to_string()));
/// ```
pub fn registered_host(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    match host.strip_prefix("www.") {
        Some(bare) if !bare.is_empty() => Some(bare.to_string()),
        _ => Some(host),
    }
}

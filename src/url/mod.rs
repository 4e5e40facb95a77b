//! URL handling module for Lemmascope
//!
//! This module provides link normalization, host extraction, and the link
//! filter that decides which discovered URLs a site crawl may follow.

mod domain;
mod normalize;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, registered_host};
pub use normalize::{normalize_link, page_path};

/// Path suffixes of resources that are never fetched as pages
const SKIPPED_EXTENSIONS: &[&str] = &[
    // images
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp", ".ico", ".tif", ".tiff",
    // archives
    ".zip", ".rar", ".7z", ".tar", ".gz", ".tgz", ".bz2", ".xz",
    // office documents
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".odt", ".ods", ".rtf",
    // database dumps
    ".sql",
];

/// Decides whether a discovered link belongs to one site's crawl
///
/// A site rooted at `https://www.example.com/` accepts links to
/// `example.com` and any of its subdomains, over HTTP or HTTPS, on the
/// root's explicit port if it has one.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    domain: String,
    port: Option<u16>,
}

impl LinkFilter {
    /// Builds the filter for a site root URL
    pub fn for_site(root: &Url) -> UrlResult<Self> {
        let domain = registered_host(root).ok_or(UrlError::MissingDomain)?;
        Ok(Self {
            domain,
            port: root.port(),
        })
    }

    /// True iff the URL is on this site's domain (or a subdomain of it)
    pub fn is_in_scope(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        if url.fragment().is_some() {
            return false;
        }
        if self.port.is_some() && url.port() != self.port {
            return false;
        }

        match extract_domain(url) {
            Some(host) => {
                host == self.domain
                    || host
                        .strip_suffix(&self.domain)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
            None => false,
        }
    }

    /// False for links to binary resources (images, archives, documents, dumps)
    pub fn is_indexable_resource(url: &Url) -> bool {
        let path = url.path().to_lowercase();
        !SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
    }

    /// Both predicates together: the link may be followed if not yet visited
    pub fn should_follow(&self, url: &Url) -> bool {
        self.is_in_scope(url) && Self::is_indexable_resource(url)
    }
}

/// Site status definitions for tracking indexing progress
///
/// A site moves from `Indexing` to one of the two terminal states; every
/// new crawl run (or single-page index) puts it back into `Indexing`.
use std::fmt;

/// Represents the current indexing state of a configured site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteStatus {
    /// A crawl or single-page index is in progress
    Indexing,

    /// The last run completed and the site is searchable
    Indexed,

    /// The last run failed or was stopped; `last_error` holds the reason
    Failed,
}

impl SiteStatus {
    /// Returns true if this is a terminal state (no run in progress)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Indexing)
    }

    /// Returns true if search may use the site's index
    pub fn is_searchable(&self) -> bool {
        matches!(self, Self::Indexed)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "INDEXING" => Some(Self::Indexing),
            "INDEXED" => Some(Self::Indexed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all statuses (useful for testing)
    pub fn all() -> [Self; 3] {
        [Self::Indexing, Self::Indexed, Self::Failed]
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

use std::collections::HashSet;
use std::fmt;

/// How a site is paginated during one run
///
/// Decided once per site from the ids already in its dataset, then passed
/// explicitly to the pagination engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlMode {
    /// Nothing stored yet: fetch every page with bounded concurrency
    FirstRun,

    /// Prior articles exist: walk pages in order and stop at seen content
    Incremental,
}

impl CrawlMode {
    /// Chooses the mode from the set of ids already persisted for a site
    pub fn for_existing(existing_ids: &HashSet<i64>) -> Self {
        if existing_ids.is_empty() {
            Self::FirstRun
        } else {
            Self::Incremental
        }
    }

    /// Returns true if pages may be fetched out of order
    pub fn is_concurrent(&self) -> bool {
        matches!(self, Self::FirstRun)
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstRun => write!(f, "first run"),
            Self::Incremental => write!(f, "incremental"),
        }
    }
}

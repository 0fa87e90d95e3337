/// Page-level decisions made while paginating a site
use std::fmt;

/// What the incremental crawl does after absorbing one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Keep going with the next page
    Continue { new: usize, duplicate: usize },

    /// The page held only stored posts; everything after it is assumed stored too
    ReachedSeenContent { duplicate: usize },
}

impl PageOutcome {
    /// Classifies a page from its new and duplicate counts
    ///
    /// Only a page with zero new posts and at least one duplicate halts the
    /// crawl. An empty page (zero of both) continues.
    pub fn from_counts(new: usize, duplicate: usize) -> Self {
        if new == 0 && duplicate > 0 {
            Self::ReachedSeenContent { duplicate }
        } else {
            Self::Continue { new, duplicate }
        }
    }

    pub fn should_halt(&self) -> bool {
        matches!(self, Self::ReachedSeenContent { .. })
    }
}

/// Why pagination of a site ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every page up to the reported total was requested
    Exhausted,

    /// A page could not be fetched (incremental mode only)
    PageFailed { page: u32 },

    /// A page contained only stored posts (incremental mode only)
    ReachedSeenContent { page: u32 },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "all pages requested"),
            Self::PageFailed { page } => write!(f, "page {} failed", page),
            Self::ReachedSeenContent { page } => {
                write!(f, "page {} contained only stored posts", page)
            }
        }
    }
}

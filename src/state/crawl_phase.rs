/// Crawl phase definitions
///
/// A crawl of one search URL walks through these phases in order; pages are fetched
/// strictly one after another.
use std::fmt;

/// Represents the current phase of one crawl invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    // ===== Gathering =====
    /// Nothing fetched yet
    Init,

    /// Page `n` (1-based) is being fetched
    FetchingPage(u32),

    /// The last fetched page is being parsed into listings
    Extracting,

    /// Another page will be fetched
    Paginating,

    /// Gathering finished, either exhausted, bounded or cut short by a fetch failure
    Done,

    // ===== Bookkeeping =====
    /// Candidates are compared against the seen store
    Reconciling,

    /// New listings are matched against the filter criteria
    Filtering,

    // ===== Terminal =====
    /// Output produced and seen state persisted
    Completed,

    /// The seen store could not be read or written
    Aborted,
}

impl CrawlPhase {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Returns true while pages are still being gathered
    pub fn is_gathering(&self) -> bool {
        matches!(
            self,
            Self::Init | Self::FetchingPage(_) | Self::Extracting | Self::Paginating
        )
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        match (*self, next) {
            (Self::Init, Self::FetchingPage(1)) => true,
            (Self::FetchingPage(_), Self::Extracting) => true,
            // fetch failure ends gathering early
            (Self::FetchingPage(_), Self::Done) => true,
            (Self::Extracting, Self::Paginating) => true,
            (Self::Extracting, Self::Done) => true,
            (Self::Paginating, Self::FetchingPage(n)) => n > 1,
            (Self::Done, Self::Reconciling) => true,
            (Self::Reconciling, Self::Filtering) => true,
            (Self::Reconciling, Self::Aborted) => true,
            (Self::Filtering, Self::Completed) => true,
            (Self::Filtering, Self::Aborted) => true,
            _ => false,
        }
    }

    /// Short lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::FetchingPage(_) => "fetching",
            Self::Extracting => "extracting",
            Self::Paginating => "paginating",
            Self::Done => "done",
            Self::Reconciling => "reconciling",
            Self::Filtering => "filtering",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchingPage(n) => write!(f, "fetching page {}", n),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

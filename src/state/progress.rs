use crate::listing::{Listing, ListingId};
use std::collections::HashSet;

/// Bounds applied to one crawl's pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlLimits {
    /// Hard ceiling on gathered listings, independent of what the site reports
    pub result_limit: u32,

    /// Optional configured bound on pages for this source
    pub max_pages: Option<u32>,

    /// Hard ceiling on pages, used when neither a hint nor `max_pages` stops the crawl
    pub page_ceiling: u32,
}

impl CrawlLimits {
    /// Returns the effective page bound: `max_pages` when configured, capped by the ceiling
    pub fn page_bound(&self) -> u32 {
        match self.max_pages {
            Some(max) => max.min(self.page_ceiling),
            None => self.page_ceiling,
        }
    }
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            result_limit: 50,
            max_pages: None,
            page_ceiling: 20,
        }
    }
}

/// Tracks pagination progress for a single crawl
///
/// Pages are recorded strictly in order. Listings are accumulated in encounter order and
/// duplicates of an id already gathered in this crawl are dropped, so that a site repeating
/// its last page does not inflate the count.
#[derive(Debug, Clone)]
pub struct CrawlProgress {
    limits: CrawlLimits,

    /// Number of pages recorded so far
    pages: u32,

    /// Result count reported by the first page that carried one
    result_hint: Option<u32>,

    /// New ids contributed by the most recent page
    last_page_new: usize,

    gathered_ids: HashSet<ListingId>,
    gathered: Vec<Listing>,
}

impl CrawlProgress {
    /// Creates an empty progress tracker bound by `limits`
    pub fn new(limits: CrawlLimits) -> Self {
        Self {
            limits,
            pages: 0,
            result_hint: None,
            last_page_new: 0,
            gathered_ids: HashSet::new(),
            gathered: Vec::new(),
        }
    }

    /// Records one extracted page
    ///
    /// # Arguments
    ///
    /// * `listings` - The page's listings in document order
    /// * `result_hint` - Result count shown on the page, if any
    ///
    /// # Returns
    ///
    /// The number of listings from this page not already gathered by this crawl
    pub fn record_page(&mut self, listings: Vec<Listing>, result_hint: Option<u32>) -> usize {
        self.pages += 1;
        if self.result_hint.is_none() {
            self.result_hint = result_hint;
        }

        let mut added = 0;
        for listing in listings {
            if self.gathered_ids.insert(listing.id) {
                self.gathered.push(listing);
                added += 1;
            }
        }
        self.last_page_new = added;
        added
    }

    /// Number of listings the crawl aims to gather
    ///
    /// `min(result_hint, result_limit)` when a hint is known, otherwise `result_limit`.
    pub fn target(&self) -> u32 {
        match self.result_hint {
            Some(hint) => hint.min(self.limits.result_limit),
            None => self.limits.result_limit,
        }
    }

    /// Decides whether another page should be fetched
    ///
    /// Continues while fewer than [`target`](Self::target) listings were gathered and the
    /// page bound is not reached. A page that contributes nothing new ends the crawl
    /// regardless of the hint.
    pub fn should_continue(&self) -> bool {
        if self.pages == 0 {
            return true;
        }
        if self.last_page_new == 0 {
            return false;
        }
        if self.pages >= self.limits.page_bound() {
            return false;
        }
        (self.gathered.len() as u64) < u64::from(self.target())
    }

    /// The page number to fetch next (1-based)
    pub fn next_page(&self) -> u32 {
        self.pages + 1
    }

    /// Number of pages recorded
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Result count hint, if any page reported one
    pub fn result_hint(&self) -> Option<u32> {
        self.result_hint
    }

    /// Number of listings gathered so far
    pub fn gathered_count(&self) -> usize {
        self.gathered.len()
    }

    /// Consumes the tracker and returns the gathered listings in encounter order
    pub fn into_listings(self) -> Vec<Listing> {
        self.gathered
    }
}

//! Crawl orchestration
//!
//! One crawl covers one search URL of one source and walks the [`CrawlPhase`] machine:
//! pages are fetched and extracted strictly in order until [`CrawlProgress`] says to stop,
//! then the gathered candidates are reconciled against the seen store, filtered, optionally
//! enriched and submitted, and the merged seen state is written back.
//!
//! Failures are absorbed where they are local: a failed page fetch ends gathering but
//! keeps what was gathered, a failed detail fetch or submission leaves the listing as it
//! is. Only seen-store failures abort a crawl, since deduplication is impossible without
//! the stored state.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::source::SourceSpec;
use crate::crawler::submit::{submit_and_record, Submitter};
use crate::filter::{self, FilterCriteria};
use crate::listing::Listing;
use crate::state::{CrawlLimits, CrawlPhase, CrawlProgress};
use crate::storage::{reconcile, SeenStore, SourceLocks};
use crate::{Result, WatchError};
use futures::future::join_all;
use std::sync::Arc;
use url::Url;

/// Counters describing one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Result pages fetched successfully
    pub pages: u32,

    /// Listings gathered across pages, after in-crawl duplicates were dropped
    pub extracted: usize,

    /// Result cards skipped because a required value was missing
    pub skipped: usize,

    /// Listings absent from the seen store
    pub new: usize,

    /// New listings that passed the filter
    pub accepted: usize,

    /// New listings rejected by the filter
    pub rejected: usize,
}

/// Result of a crawl that reached the `Completed` phase
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub source: String,
    pub url: String,

    /// New listings that passed the filter, in encounter order
    pub accepted: Vec<Listing>,

    pub stats: CrawlStats,

    /// Set when a page fetch failed and gathering stopped early
    pub fetch_error: Option<String>,
}

impl CrawlOutcome {
    /// Returns true if gathering was cut short by a fetch failure
    pub fn is_partial(&self) -> bool {
        self.fetch_error.is_some()
    }
}

/// One crawl attempt within a run, successful or not
#[derive(Debug)]
pub struct CrawlAttempt {
    pub source: String,
    pub url: String,
    pub result: Result<CrawlOutcome>,
}

/// Drives crawls of configured sources
pub struct CrawlOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn SeenStore>,
    locks: SourceLocks,
    criteria: Arc<FilterCriteria>,
    limits: CrawlLimits,
    submitter: Option<Arc<dyn Submitter>>,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator with default limits and no submitter
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Transport used for result and detail pages
    /// * `store` - Seen-listing store shared by all sources
    /// * `criteria` - Global filter criteria
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn SeenStore>,
        criteria: FilterCriteria,
    ) -> Self {
        Self {
            fetcher,
            store,
            locks: SourceLocks::new(),
            criteria: Arc::new(criteria),
            limits: CrawlLimits::default(),
            submitter: None,
        }
    }

    pub fn with_limits(mut self, limits: CrawlLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Installs the collaborator used by sources with `auto-submit`
    pub fn with_submitter(mut self, submitter: Arc<dyn Submitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub fn limits(&self) -> CrawlLimits {
        self.limits
    }

    /// Limits for one source: its own page bound wins, single-page sources stop after page 1
    fn limits_for(&self, spec: &SourceSpec) -> CrawlLimits {
        let max_pages = if spec.pagination.is_single() {
            Some(1)
        } else {
            spec.max_pages.or(self.limits.max_pages)
        };
        CrawlLimits {
            max_pages,
            ..self.limits
        }
    }

    /// Crawls one search URL of a source
    ///
    /// # Arguments
    ///
    /// * `spec` - The source being crawled
    /// * `search_url` - Page 1 of the search
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The crawl completed, possibly with a partial gather
    /// * `Err(WatchError::Store)` - The seen state could not be read or written
    pub async fn crawl(&self, spec: &SourceSpec, search_url: &Url) -> Result<CrawlOutcome> {
        let mut phase = CrawlPhase::Init;
        let mut progress = CrawlProgress::new(self.limits_for(spec));
        let mut stats = CrawlStats::default();
        let mut fetch_error = None;

        tracing::info!("[{}] Crawling {}", spec.name, search_url);

        while progress.should_continue() {
            let page_no = progress.next_page();
            advance(&mut phase, CrawlPhase::FetchingPage(page_no))?;

            let page_url = spec.pagination.page_url(search_url, page_no);
            let body = match self.fetcher.fetch(page_url.as_str()).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(
                        "[{}] Fetching page {} failed, keeping {} gathered listings: {}",
                        spec.name,
                        page_no,
                        progress.gathered_count(),
                        e
                    );
                    fetch_error = Some(e.to_string());
                    break;
                }
            };
            stats.pages += 1;

            advance(&mut phase, CrawlPhase::Extracting)?;
            let page = spec.extractor.extract(&body);
            stats.skipped += page.rejected;
            let added = progress.record_page(page.listings, page.result_count);
            tracing::debug!(
                "[{}] Page {}: {} new in this crawl, {} gathered, hint {:?}",
                spec.name,
                page_no,
                added,
                progress.gathered_count(),
                progress.result_hint()
            );

            if progress.should_continue() {
                advance(&mut phase, CrawlPhase::Paginating)?;
            }
        }
        advance(&mut phase, CrawlPhase::Done)?;

        let candidates = progress.into_listings();
        stats.extracted = candidates.len();

        // load, reconcile and save must not interleave with another crawl of this source
        let _guard = self.locks.lock(&spec.name).await;

        advance(&mut phase, CrawlPhase::Reconciling)?;
        let loaded = match self.store.load(&spec.name) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!("[{}] Cannot read seen state, crawl aborted: {}", spec.name, e);
                advance(&mut phase, CrawlPhase::Aborted)?;
                return Err(e.into());
            }
        };
        let (new_listings, mut merged) = reconcile(loaded, &candidates);
        stats.new = new_listings.len();

        advance(&mut phase, CrawlPhase::Filtering)?;
        let mut accepted = Vec::with_capacity(new_listings.len());
        for listing in new_listings {
            match filter::check(&self.criteria, spec.filter.as_ref(), &listing) {
                None => accepted.push(listing),
                Some(rejection) => {
                    tracing::debug!("[{}] Listing {} filtered: {}", spec.name, listing.id, rejection);
                    stats.rejected += 1;
                }
            }
        }
        stats.accepted = accepted.len();

        if spec.details.is_some() {
            for listing in accepted.iter_mut() {
                self.enrich(spec, listing).await;
            }
        }

        if spec.auto_submit {
            match &self.submitter {
                Some(submitter) => {
                    for listing in accepted.iter_mut() {
                        submit_and_record(submitter.as_ref(), listing).await;
                    }
                }
                None => tracing::warn!(
                    "[{}] auto-submit is enabled but no submitter is installed",
                    spec.name
                ),
            }
        }

        for listing in &accepted {
            merged.insert(listing.id, listing.clone());
        }

        if let Err(e) = self.store.save(&spec.name, &merged) {
            tracing::error!("[{}] Cannot write seen state, crawl aborted: {}", spec.name, e);
            advance(&mut phase, CrawlPhase::Aborted)?;
            return Err(e.into());
        }
        advance(&mut phase, CrawlPhase::Completed)?;

        tracing::info!(
            "[{}] {} pages, {} listings, {} new, {} accepted",
            spec.name,
            stats.pages,
            stats.extracted,
            stats.new,
            stats.accepted
        );

        Ok(CrawlOutcome {
            source: spec.name.clone(),
            url: search_url.to_string(),
            accepted,
            stats,
            fetch_error,
        })
    }

    /// Fills `available_from` from the listing's own page; failures leave it unchanged
    async fn enrich(&self, spec: &SourceSpec, listing: &mut Listing) {
        let Some(details) = &spec.details else {
            return;
        };
        if listing.url.is_empty() {
            return;
        }

        match self.fetcher.fetch(&listing.url).await {
            Ok(page) => listing.available_from = Some(details.available_from(&page)),
            Err(e) => tracing::warn!(
                "[{}] Detail page of {} unavailable: {}",
                spec.name,
                listing.id,
                e
            ),
        }
    }

    /// Crawls every search URL of one source, one after another
    pub async fn crawl_source(&self, spec: &SourceSpec) -> Vec<CrawlAttempt> {
        let mut attempts = Vec::with_capacity(spec.urls.len());
        for url in &spec.urls {
            let result = self.crawl(spec, url).await;
            if let Err(e) = &result {
                tracing::warn!("[{}] Crawl of {} failed: {}", spec.name, url, e);
            }
            attempts.push(CrawlAttempt {
                source: spec.name.clone(),
                url: url.to_string(),
                result,
            });
        }
        attempts
    }

    /// Crawls all sources concurrently
    ///
    /// Sources share no mutable state, so each runs as its own future; attempts are
    /// returned grouped by source in the order of `specs`.
    pub async fn crawl_all(&self, specs: &[SourceSpec]) -> Vec<CrawlAttempt> {
        join_all(specs.iter().map(|spec| self.crawl_source(spec)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Moves `phase` to `next`, rejecting transitions the crawl machine does not allow
fn advance(phase: &mut CrawlPhase, next: CrawlPhase) -> Result<()> {
    if !phase.can_transition_to(next) {
        return Err(WatchError::InvalidTransition {
            from: *phase,
            to: next,
        });
    }
    tracing::trace!("{} -> {}", phase, next);
    *phase = next;
    Ok(())
}

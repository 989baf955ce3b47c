//! Crawler module for fetching and processing search results
//!
//! This module contains the core crawling logic, including:
//! - The page fetcher contract and its HTTP implementation with retry logic
//! - Source specs compiled from the configuration
//! - The auto-submit contract
//! - Overall crawl orchestration

mod coordinator;
mod fetcher;
mod source;
mod submit;

pub use coordinator::{CrawlAttempt, CrawlOrchestrator, CrawlOutcome, CrawlStats};
pub use fetcher::{
    build_http_client, is_challenge_page, FetchPolicy, HttpFetcher, PageFetcher, UserAgentPool,
};
pub use source::SourceSpec;
pub use submit::{submit_and_record, SubmitError, Submitter};

use crate::config::Config;
use crate::state::CrawlLimits;
use crate::storage::SeenStore;
use crate::WatchError;
use std::sync::Arc;

/// Builds an orchestrator wired the way the configuration describes
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `store` - The opened seen-listing store
///
/// # Returns
///
/// * `Ok(CrawlOrchestrator)` - Ready to crawl
/// * `Err(WatchError)` - The HTTP client could not be built
pub fn build_orchestrator(
    config: &Config,
    store: Arc<dyn SeenStore>,
) -> Result<CrawlOrchestrator, WatchError> {
    let fetcher = HttpFetcher::from_config(config)?;
    let limits = CrawlLimits {
        result_limit: config.crawler.result_limit,
        max_pages: config.crawler.max_pages,
        page_ceiling: config.crawler.page_ceiling,
    };

    Ok(
        CrawlOrchestrator::new(Arc::new(fetcher), store, config.filter.clone())
            .with_limits(limits),
    )
}

//! State module for tracking a single crawl
//!
//! # Components
//!
//! - `CrawlPhase`: the phase a crawl invocation is in (fetching, extracting, reconciling, ...)
//! - `CrawlProgress`: pagination bookkeeping that decides whether another page is fetched

mod crawl_phase;
mod progress;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use progress::{CrawlLimits, CrawlProgress};

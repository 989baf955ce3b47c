//! Flatwatch: an apartment-listing watcher
//!
//! This crate crawls real-estate marketplace search pages, extracts listings from their
//! HTML or embedded JSON, drops listings that were already seen or that do not match the
//! configured criteria, and hands the remaining ones to notification collaborators.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod filter;
pub mod listing;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Flatwatch operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] extract::ExtractionError),

    #[error("Invalid crawl transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Page fetch errors
///
/// None of these stop a run: the affected crawl ends early and keeps what it gathered.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Unresolved verification challenge at {url}")]
    Challenge { url: String },
}

impl FetchError {
    /// Returns true if another attempt may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http { source, .. } => source.is_connect() || source.is_timeout(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Challenge { .. } => false,
        }
    }
}

/// Result type alias for Flatwatch operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOrchestrator, CrawlOutcome, PageFetcher, SourceSpec};
pub use extract::ListingExtractor;
pub use filter::FilterCriteria;
pub use listing::{Applied, Listing, ListingId};
pub use state::CrawlPhase;
pub use storage::{SeenMap, SeenStore};

//! Seen-store trait and error types
//!
//! This module defines the trait interface for seen-listing backends and the
//! associated error types.

use crate::listing::{Listing, ListingId};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during store operations
///
/// Any of these is fatal for the affected source's crawl: without its seen state a source
/// cannot be deduplicated safely.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Seen state of '{name}' is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Seen listings of one source, keyed by id
pub type SeenMap = BTreeMap<ListingId, Listing>;

/// Persistent per-source record of previously processed listings
///
/// Implementations must make [`save`](SeenStore::save) atomic: after a crash the source's
/// record is either the previous complete mapping or the new complete mapping.
pub trait SeenStore: Send + Sync {
    /// Loads the seen mapping of `source`
    ///
    /// # Returns
    ///
    /// * `Ok(SeenMap)` - The stored mapping, empty if the source was never saved
    /// * `Err(StoreError)` - If the stored state cannot be read or is corrupt
    fn load(&self, source: &str) -> StoreResult<SeenMap>;

    /// Replaces the stored mapping of `source` with `seen`
    fn save(&self, source: &str, seen: &SeenMap) -> StoreResult<()>;

    /// Lists every stored source with its number of seen listings
    fn sources(&self) -> StoreResult<Vec<(String, usize)>>;

    /// Forgets everything stored for `source`
    fn clear(&self, source: &str) -> StoreResult<()>;
}

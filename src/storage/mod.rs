//! Storage module for the seen-listing record
//!
//! This module persists, per source, which listings were already processed:
//! - the [`SeenStore`] contract and its error type
//! - a SQLite backend (default) and a JSON-file backend
//! - per-source locks serializing load, reconcile and save
//! - the pure [`reconcile`] step computing new listings

mod json_file;
mod locks;
mod reconcile;
mod schema;
mod sqlite;
mod traits;

pub use json_file::JsonSeenStore;
pub use locks::SourceLocks;
pub use reconcile::reconcile;
pub use sqlite::SqliteSeenStore;
pub use traits::{SeenMap, SeenStore, StoreError, StoreResult};

use crate::config::{StoreBackend, StoreConfig};
use std::sync::Arc;

/// Opens the configured store backend
///
/// # Arguments
///
/// * `config` - The `[store]` section of the configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn SeenStore>)` - The opened store
/// * `Err(StoreError)` - If the database or directory cannot be opened
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn SeenStore>> {
    Ok(match config.backend {
        StoreBackend::Sqlite => Arc::new(SqliteSeenStore::new(&config.path)?),
        StoreBackend::Json => Arc::new(JsonSeenStore::new(&config.path)?),
    })
}

//! SQLite seen store
//!
//! The default backend. A source's mapping is replaced inside one transaction, so a crash
//! leaves either the old or the new rows.

use crate::listing::{Listing, ListingId};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SeenMap, SeenStore, StoreError, StoreResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteSeenStore {
    conn: Mutex<Connection>,
}

impl SqliteSeenStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSeenStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn new(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(format!("database connection poisoned: {}", e)))
    }
}

fn to_db_id(id: ListingId) -> StoreResult<i64> {
    i64::try_from(id).map_err(|_| StoreError::Database(format!("listing id {} out of range", id)))
}

impl SeenStore for SqliteSeenStore {
    fn load(&self, source: &str) -> StoreResult<SeenMap> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT listing_id, snapshot FROM seen_listings WHERE source = ?1")?;

        let rows = stmt.query_map(params![source], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut seen = SeenMap::new();
        for row in rows {
            let (listing_id, snapshot) = row?;
            let listing: Listing =
                serde_json::from_str(&snapshot).map_err(|e| StoreError::Corrupt {
                    name: source.to_string(),
                    reason: format!("listing {}: {}", listing_id, e),
                })?;

            if to_db_id(listing.id)? != listing_id {
                return Err(StoreError::Corrupt {
                    name: source.to_string(),
                    reason: format!(
                        "row {} holds a snapshot of listing {}",
                        listing_id, listing.id
                    ),
                });
            }
            seen.insert(listing.id, listing);
        }

        Ok(seen)
    }

    fn save(&self, source: &str, seen: &SeenMap) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM seen_listings WHERE source = ?1", params![source])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO seen_listings (source, listing_id, snapshot, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (id, listing) in seen {
                let snapshot = serde_json::to_string(listing)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                stmt.execute(params![source, to_db_id(*id)?, snapshot, now])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn sources(&self) -> StoreResult<Vec<(String, usize)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source, COUNT(*) FROM seen_listings GROUP BY source ORDER BY source",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut sources = Vec::new();
        for row in rows {
            let (source, count) = row?;
            sources.push((source, count.max(0) as usize));
        }
        Ok(sources)
    }

    fn clear(&self, source: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM seen_listings WHERE source = ?1", params![source])?;
        Ok(())
    }
}

//! JSON-file seen store
//!
//! One file per source (`<dir>/<source>.json`) holding the id to snapshot mapping. Files are
//! replaced by writing a temporary file in the same directory and renaming it over the old
//! one, so readers never observe a partially written file.

use crate::storage::traits::{SeenMap, SeenStore, StoreError, StoreResult};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Directory of per-source JSON files
pub struct JsonSeenStore {
    dir: PathBuf,
}

impl JsonSeenStore {
    /// Creates a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{}.json", source))
    }
}

impl SeenStore for JsonSeenStore {
    fn load(&self, source: &str) -> StoreResult<SeenMap> {
        let text = match fs::read_to_string(self.path_for(source)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SeenMap::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
            name: source.to_string(),
            reason: e.to_string(),
        })
    }

    fn save(&self, source: &str, seen: &SeenMap) -> StoreResult<()> {
        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, seen)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(source))
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn sources(&self) -> StoreResult<Vec<(String, usize)>> {
        let mut sources = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(source) = path.file_stem().and_then(|s| s.to_str()) {
                let count = self.load(source)?.len();
                sources.push((source.to_string(), count));
            }
        }
        sources.sort();
        Ok(sources)
    }

    fn clear(&self, source: &str) -> StoreResult<()> {
        match fs::remove_file(self.path_for(source)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Listing;
    use tempfile::TempDir;

    fn seen(ids: &[u64], source: &str) -> SeenMap {
        ids.iter().map(|id| (*id, Listing::new(*id, source))).collect()
    }

    #[test]
    fn test_first_run_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonSeenStore::new(dir.path()).unwrap();
        assert!(store.load("immowelt").unwrap().is_empty());
        assert!(store.sources().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonSeenStore::new(dir.path()).unwrap();
        let map = seen(&[5601699193727809, 2], "immowelt");

        store.save("immowelt", &map).unwrap();
        assert_eq!(store.load("immowelt").unwrap(), map);
        assert!(dir.path().join("immowelt.json").exists());
    }

    #[test]
    fn test_save_replaces_file_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let store = JsonSeenStore::new(dir.path()).unwrap();

        store.save("ebay", &seen(&[1, 2, 3], "ebay")).unwrap();
        store.save("ebay", &seen(&[4], "ebay")).unwrap();

        assert_eq!(store.load("ebay").unwrap().len(), 1);
        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ebay.json"), "{\"1\": {\"truncated").unwrap();

        let store = JsonSeenStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.load("ebay"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_sources_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = JsonSeenStore::new(dir.path()).unwrap();
        store.save("wg_gesucht", &seen(&[1, 2], "wg_gesucht")).unwrap();
        store.save("ebay", &seen(&[9], "ebay")).unwrap();

        assert_eq!(
            store.sources().unwrap(),
            vec![("ebay".to_string(), 1), ("wg_gesucht".to_string(), 2)]
        );

        store.clear("ebay").unwrap();
        store.clear("never-saved").unwrap();
        assert_eq!(store.sources().unwrap().len(), 1);
    }
}

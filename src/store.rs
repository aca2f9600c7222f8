//! Persisted feed cache
//!
//! One JSON file per feed-pair, addressed by its storage key, holding the
//! coordinator's full state. The file is rewritten wholesale on every
//! change; there are no partial writes. Timestamps round-trip as RFC 3339
//! strings and prices as decimal strings, so a reload reproduces the saved
//! state exactly.

use crate::coordinator::CoordinatorData;
use crate::error::Result;
use crate::logging::get_logger;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Version tag of the on-disk format
pub const STORAGE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredState {
    version: u32,
    data: CoordinatorData,
}

/// File-backed cache for one feed-pair's coordinator state
pub struct CacheStore {
    file_path: PathBuf,
    logger: crate::logging::StructuredLogger,
}

impl CacheStore {
    /// Create a store for the given storage key under the state directory
    pub fn new<P: AsRef<Path>>(state_dir: P, storage_key: &str) -> Self {
        let file_path = state_dir
            .as_ref()
            .join(format!("helios.{storage_key}.json"));

        Self {
            file_path,
            logger: get_logger("store"),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Load the last saved state; `Ok(None)` if nothing has been saved yet.
    ///
    /// A version mismatch yields `Ok(None)` as well: an incompatible cache
    /// is discarded and rebuilt from the feeds, never a startup failure.
    pub fn load(&self) -> Result<Option<CoordinatorData>> {
        if !self.file_path.exists() {
            self.logger.info("No cached feed state found");
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.file_path)?;
        let stored: StoredState = serde_json::from_str(&contents)?;

        if stored.version != STORAGE_VERSION {
            self.logger.warn(&format!(
                "Discarding cached feed state with unknown version {}",
                stored.version
            ));
            return Ok(None);
        }

        Ok(Some(stored.data))
    }

    /// Overwrite the stored state
    pub fn save(&self, data: &CoordinatorData) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let stored = StoredState {
            version: STORAGE_VERSION,
            data: data.clone(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.file_path, contents)?;
        self.logger.debug("Saved feed cache");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_includes_storage_key() {
        let store = CacheStore::new("/var/lib/helios", "electricity.15");
        assert_eq!(
            store.path(),
            Path::new("/var/lib/helios/helios.electricity.15.json")
        );
    }

    #[test]
    fn load_without_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "gas");
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn unknown_version_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "gas");
        std::fs::write(store.path(), r#"{"version": 99, "data": {}}"#).unwrap();
        assert!(store.load().unwrap().is_none());
    }
}

//! Filter expression stores.
//!
//! [`MemoryStore`] keeps expressions for the lifetime of the process;
//! [`FileStore`] writes one JSON file per storage key.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anitools_core::{Error, FilterStore, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// In-process store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl FilterStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed store, one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::InvalidInput(format!("invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl FilterStore for FileStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                debug!(path = %path.display(), bytes = text.len(), "Loaded persisted filters");
                Ok(Some(text))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read persisted filters");
                Err(Error::Storage(format!("read {}: {}", path.display(), e)))
            }
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::Storage(format!("create {}: {}", self.dir.display(), e)))?;

        // Readers never see a partial file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| Error::Storage(format!("write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::Storage(format!("rename {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), bytes = value.len(), "Persisted filters");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load("filters-anime").await.unwrap().is_none());
        store.save("filters-anime", r#"{"and":{}}"#).await.unwrap();
        assert_eq!(
            store.load("filters-anime").await.unwrap().as_deref(),
            Some(r#"{"and":{}}"#)
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert!(store.load("filters-manga").await.unwrap().is_none());
        store.save("filters-manga", "first").await.unwrap();
        store.save("filters-manga", "second").await.unwrap();
        assert_eq!(
            store.load("filters-manga").await.unwrap().as_deref(),
            Some("second")
        );
        assert!(dir.path().join("nested").join("filters-manga.json").exists());
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.save("../escape", "x").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(store.load("").await.is_err());
    }
}

//! Durable key-value side-stores

use crate::error::PersistenceError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Durable string key-value storage
///
/// A missing key reads as `None`. Implementations decide what "durable"
/// means; the session store only relies on a completed `write` being visible
/// to a later `read`.
#[async_trait]
pub trait SideStore: Send + Sync + Debug {
    /// Read the value stored under `key`
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Store `value` under `key`, replacing any previous value
    async fn write(&self, key: &str, value: String) -> Result<(), PersistenceError>;

    /// Delete `key`; deleting a missing key succeeds
    async fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Process-local side-store
#[derive(Debug, Default)]
pub struct MemorySideStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySideStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.lock().insert(key.into(), value.into());
    }

    /// Raw value without going through the async interface
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Number of stored keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SideStore for MemorySideStore {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Side-store keeping one JSON file per key in a directory
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so a reader never sees a half-written value.
#[derive(Debug, Clone)]
pub struct FileSideStore {
    root: PathBuf,
}

impl FileSideStore {
    /// Create store rooted at `root`; the directory is created on first write
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{name}.json"))
    }
}

#[async_trait]
impl SideStore for FileSideStore {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::io_error(path, e)),
        }
    }

    async fn write(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PersistenceError::io_error(&self.root, e))?;

        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, value.as_bytes())
            .await
            .map_err(|e| PersistenceError::io_error(&staging, e))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| PersistenceError::io_error(&path, e))?;

        tracing::trace!(path = %path.display(), "side-store write");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::io_error(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemorySideStore::new();
        assert_eq!(store.read("k").await.unwrap(), None);

        store.write("k", "v".to_string()).await.unwrap();
        assert_eq!(store.read("k").await.unwrap(), Some("v".to_string()));

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSideStore::new(dir.path().join("nested"));

        assert_eq!(store.read("xui-session").await.unwrap(), None);
        store.write("xui-session", "{\"a\":1}".to_string()).await.unwrap();
        assert_eq!(
            store.read("xui-session").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(!store.path_for("xui-session").with_extension("json.tmp").exists());

        store.remove("xui-session").await.unwrap();
        assert_eq!(store.read("xui-session").await.unwrap(), None);
    }

    #[test]
    fn file_store_sanitizes_keys() {
        let store = FileSideStore::new("/data");
        assert_eq!(store.path_for("../etc/passwd"), PathBuf::from("/data/___etc_passwd.json"));
        assert_eq!(store.path_for("xui-token"), PathBuf::from("/data/xui-token.json"));
    }
}

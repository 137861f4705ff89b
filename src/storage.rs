//! Durable key-value storage scoped to this application.
//!
//! Mirrors the webview's local storage: string keys, string values, and a
//! `"null"` value is stored verbatim but read back as unset.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::error::StorageError;

/// Sentinel some callers persist instead of removing a key
pub const NULL_SENTINEL: &str = "null";

/// Returns `true` when a persisted value should be treated as absent
pub fn is_unset(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => v.is_empty() || v == NULL_SENTINEL,
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Store backed by a single JSON object file
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Option<HashMap<String, String>>>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like `load`, but a corrupt file yields an empty map so the next write replaces it
    async fn load_or_reset(&self) -> Result<HashMap<String, String>, StorageError> {
        match self.load().await {
            Err(StorageError::Json(e)) => {
                tracing::warn!(target: "storage", path = %self.path.display(), error = %e, "Storage file is corrupt, starting from an empty store");
                Ok(HashMap::new())
            }
            other => other,
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        Ok(guard.as_ref().and_then(|entries| entries.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_or_reset().await?);
        }
        let entries = guard.get_or_insert_with(HashMap::new);
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(entries)?;

        // An interrupted write leaves the previous file intact
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, raw).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::trace!(target: "storage", key = %key, path = %self.path.display(), "Persisted value");
        Ok(())
    }
}

/// In-process store; nothing survives a restart
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls observed so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sentinel_is_unset() {
        assert!(is_unset(None));
        assert!(is_unset(Some("")));
        assert!(is_unset(Some("null")));
        assert!(!is_unset(Some("C:\\app")));
    }

    #[tokio::test]
    async fn test_json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = JsonFileStore::new(path.clone());
        assert_eq!(store.get("exe_dir").await.unwrap(), None);
        store.set("exe_dir", "/opt/app").await.unwrap();

        let reopened = JsonFileStore::new(path);
        assert_eq!(
            reopened.get("exe_dir").await.unwrap().as_deref(),
            Some("/opt/app")
        );
    }

    #[tokio::test]
    async fn test_json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let store = JsonFileStore::new(path);
        assert!(matches!(
            store.get("exe_dir").await,
            Err(StorageError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_json_store_set_repairs_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"exe_dir": "/opt/fa"#).unwrap();

        let store = JsonFileStore::new(path.clone());
        store.set("exe_dir", "/opt/face").await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let entries: HashMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.get("exe_dir").map(String::as_str), Some("/opt/face"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_memory_store_counts_writes() {
        let store = MemoryStore::new();
        store.set("a", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
    }
}

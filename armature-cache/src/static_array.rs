//! Read-only snapshot store backed by a fallback cache.
//!
//! The snapshot is a JSON object mapping keys to JSON values, produced by
//! [`StaticArrayCache::warm_up`] and loaded lazily on first access. Keys in the
//! snapshot are read-only; everything else is served by the backup store.

use crate::config::validate_key;
use crate::error::{CacheError, CacheResult};
use crate::traits::{CacheStore, SharedStore};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

type Snapshot = Arc<HashMap<String, String>>;

pub struct StaticArrayCache {
    file_path: PathBuf,
    backup: SharedStore,
    snapshot: RwLock<Option<Snapshot>>,
}

impl StaticArrayCache {
    pub fn new(file_path: impl Into<PathBuf>, backup: SharedStore) -> Self {
        Self {
            file_path: file_path.into(),
            backup,
            snapshot: RwLock::new(None),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// The store receiving misses and writes.
    pub fn backup(&self) -> &SharedStore {
        &self.backup
    }

    /// Write a new snapshot file from serialized JSON values and load it.
    pub async fn warm_up(&self, values: HashMap<String, String>) -> CacheResult<()> {
        let mut object = Map::new();
        for (key, json) in values {
            validate_key(&key)?;
            let value: Value = serde_json::from_str(&json)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            object.insert(key, value);
        }

        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.file_path, serde_json::to_vec(&Value::Object(object))?).await?;

        debug!(path = %self.file_path.display(), "Static array snapshot written");
        *self.snapshot.write().await = None;
        self.load().await?;
        Ok(())
    }

    async fn load(&self) -> CacheResult<Snapshot> {
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(snapshot.clone());
        }

        let mut slot = self.snapshot.write().await;
        if let Some(snapshot) = slot.as_ref() {
            return Ok(snapshot.clone());
        }

        let snapshot: Snapshot = match tokio::fs::read(&self.file_path).await {
            Ok(bytes) => {
                let object: Map<String, Value> = serde_json::from_slice(&bytes)
                    .map_err(|e| CacheError::Deserialization(e.to_string()))?;
                Arc::new(
                    object
                        .into_iter()
                        .map(|(key, value)| (key, value.to_string()))
                        .collect(),
                )
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Arc::new(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        *slot = Some(snapshot.clone());
        Ok(snapshot)
    }
}

#[async_trait]
impl CacheStore for StaticArrayCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        validate_key(key)?;
        if let Some(value) = self.load().await?.get(key) {
            return Ok(Some(value.clone()));
        }
        self.backup.get_json(key).await
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        validate_key(key)?;
        if self.load().await?.contains_key(key) {
            return Err(CacheError::ReadOnly(key.to_string()));
        }
        self.backup.set_json(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        validate_key(key)?;
        if self.load().await?.contains_key(key) {
            return Err(CacheError::ReadOnly(key.to_string()));
        }
        self.backup.delete(key).await
    }

    /// Drops the whole snapshot; `prefix` only narrows the backup clear.
    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        match tokio::fs::remove_file(&self.file_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *self.snapshot.write().await = Some(Arc::new(HashMap::new()));
        self.backup.clear_prefix(prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayCache;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_snapshot_then_backup() {
        let dir = tempfile::tempdir().unwrap();
        let backup: SharedStore = Arc::new(ArrayCache::new());
        let cache = StaticArrayCache::new(dir.path().join("snapshot.json"), backup.clone());

        cache
            .warm_up(values(&[("static", "{\"a\":1}")]))
            .await
            .unwrap();
        backup.set_json("dynamic", "2".to_string(), None).await.unwrap();

        assert_eq!(cache.get_json("static").await.unwrap(), Some("{\"a\":1}".to_string()));
        assert_eq!(cache.get_json("dynamic").await.unwrap(), Some("2".to_string()));
        assert_eq!(cache.get_json("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_snapshot_keys_are_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let backup: SharedStore = Arc::new(ArrayCache::new());
        let cache = StaticArrayCache::new(dir.path().join("snapshot.json"), backup.clone());
        cache.warm_up(values(&[("static", "1")])).await.unwrap();

        let err = cache.set_json("static", "2".to_string(), None).await;
        assert!(matches!(err, Err(CacheError::ReadOnly(_))));

        cache.set_json("other", "3".to_string(), None).await.unwrap();
        assert_eq!(backup.get_json("other").await.unwrap(), Some("3".to_string()));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let backup: SharedStore = Arc::new(ArrayCache::new());
        let cache = StaticArrayCache::new(dir.path().join("absent.json"), backup);

        cache.set_json("k", "1".to_string(), None).await.unwrap();
        assert_eq!(cache.get_json("k").await.unwrap(), Some("1".to_string()));

        cache.clear().await.unwrap();
        assert_eq!(cache.get_json("k").await.unwrap(), None);
    }
}

//! Read-optimized file store.
//!
//! Shares the on-disk layout of [`FilesystemCache`] but keeps every decoded
//! item in memory after its first read. Writes through this instance keep the
//! memo current; files changed by other processes are only seen after
//! [`MemoizedFilesCache::forget`] or a clear.

use crate::config::unix_now;
use crate::error::CacheResult;
use crate::filesystem::{Envelope, FilesystemCache};
use crate::traits::CacheStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub struct MemoizedFilesCache {
    files: FilesystemCache,
    memo: RwLock<HashMap<String, Envelope>>,
}

impl MemoizedFilesCache {
    /// Create a store; `namespace` follows the rules of [`FilesystemCache::new`].
    pub fn new(
        namespace: impl Into<String>,
        default_lifetime: u64,
        directory: impl AsRef<Path>,
    ) -> CacheResult<Self> {
        Ok(Self {
            files: FilesystemCache::new(namespace, default_lifetime, directory)?,
            memo: RwLock::new(HashMap::new()),
        })
    }

    pub fn directory(&self) -> &Path {
        self.files.directory()
    }

    pub fn namespace(&self) -> &str {
        self.files.namespace()
    }

    pub fn default_lifetime(&self) -> u64 {
        self.files.default_lifetime()
    }

    /// Drop the in-memory copies so the next reads hit the files again.
    pub fn forget(&self) {
        self.memo.write().clear();
    }

    fn memoized(&self, key: &str) -> Option<Option<String>> {
        let memo = self.memo.read();
        let envelope = memo.get(key)?;
        if envelope.is_expired(unix_now()) {
            Some(None)
        } else {
            Some(Some(envelope.value.clone()))
        }
    }
}

#[async_trait]
impl CacheStore for MemoizedFilesCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        match self.memoized(key) {
            Some(Some(value)) => return Ok(Some(value)),
            Some(None) => {
                self.memo.write().remove(key);
                self.files.remove_item(key).await?;
                return Ok(None);
            }
            None => {}
        }

        let envelope = self.files.read_envelope(key).await?;
        Ok(envelope.map(|envelope| {
            let value = envelope.value.clone();
            self.memo.write().insert(key.to_string(), envelope);
            value
        }))
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let envelope = self.files.write_envelope(key, value, ttl).await?;
        self.memo.write().insert(key.to_string(), envelope);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.memo.write().remove(key);
        self.files.remove_item(key).await
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        self.memo.write().retain(|key, _| !key.starts_with(prefix));
        self.files.remove_prefixed(prefix).await
    }
}

//! Process-wide shared memory store.
//!
//! Every [`SharedMemoryCache`] in the process reads and writes the same
//! segment; namespaces keep their keys apart. A namespace can carry a
//! version: opening it with a different version drops its previous content.

use crate::config::{StoreConfig, expiry_timestamp, unix_now};
use crate::error::CacheResult;
use crate::traits::CacheStore;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

struct SharedEntry {
    value: String,
    expires_at: Option<u64>,
}

static SEGMENT: Lazy<RwLock<HashMap<String, SharedEntry>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static VERSIONS: Lazy<RwLock<HashMap<String, String>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Store backed by the process-wide shared segment.
#[derive(Debug, Clone)]
pub struct SharedMemoryCache {
    config: StoreConfig,
    version: Option<String>,
}

impl SharedMemoryCache {
    /// Open a namespace of the shared segment.
    pub fn new(namespace: impl Into<String>, default_lifetime: u64) -> Self {
        Self {
            config: StoreConfig::new()
                .with_namespace(namespace)
                .with_default_lifetime(default_lifetime),
            version: None,
        }
    }

    /// Open a versioned namespace, dropping its entries if the stored version differs.
    pub fn with_version(
        namespace: impl Into<String>,
        default_lifetime: u64,
        version: impl Into<String>,
    ) -> Self {
        let cache = Self {
            version: Some(version.into()),
            ..Self::new(namespace, default_lifetime)
        };
        cache.reconcile_version();
        cache
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn default_lifetime(&self) -> u64 {
        self.config.default_lifetime
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn reconcile_version(&self) {
        let Some(version) = &self.version else {
            return;
        };

        let mut versions = VERSIONS.write();
        let previous = versions.insert(self.config.namespace.clone(), version.clone());
        if previous.as_ref().is_some_and(|p| p != version) {
            debug!(
                namespace = %self.config.namespace,
                version = %version,
                "Shared memory namespace version changed, clearing"
            );
            self.clear_segment("");
        }
    }

    fn clear_segment(&self, prefix: &str) {
        let mut segment = SEGMENT.write();
        match self.config.scoped_prefix(prefix) {
            Some(prefix) => segment.retain(|key, _| !key.starts_with(&prefix)),
            None => segment.clear(),
        }
    }
}

#[async_trait]
impl CacheStore for SharedMemoryCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        let key = self.config.build_key(key)?;
        let now = unix_now();

        let segment = SEGMENT.read();
        Ok(segment
            .get(&key)
            .filter(|entry| entry.expires_at.is_none_or(|exp| exp > now))
            .map(|entry| entry.value.clone()))
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let key = self.config.build_key(key)?;
        let expires_at = expiry_timestamp(self.config.effective_ttl(ttl));

        SEGMENT.write().insert(key, SharedEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let key = self.config.build_key(key)?;
        SEGMENT.write().remove(&key);
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        self.clear_segment(prefix);
        Ok(())
    }
}

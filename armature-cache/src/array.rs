//! In-process array store.

use crate::config::{StoreConfig, validate_key};
use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// In-memory cache living inside the current process.
pub struct ArrayCache {
    state: RwLock<ArrayState>,
    config: StoreConfig,
    store_serialized: bool,
    max_items: usize,
}

#[derive(Default)]
struct ArrayState {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
}

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
    seq: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

impl ArrayCache {
    /// Create an unbounded cache whose items never expire.
    pub fn new() -> Self {
        Self::with_options(0, true, 0, 0)
    }

    /// Create a cache with explicit settings.
    ///
    /// * `default_lifetime` - seconds applied to writes without TTL, `0` for none
    /// * `store_serialized` - normalize values through JSON on write
    /// * `max_lifetime` - upper bound for TTLs in seconds, `0` for none
    /// * `max_items` - evict the oldest entry beyond this count, `0` for unbounded
    pub fn with_options(
        default_lifetime: u64,
        store_serialized: bool,
        max_lifetime: u64,
        max_items: usize,
    ) -> Self {
        Self {
            state: RwLock::new(ArrayState::default()),
            config: StoreConfig::new()
                .with_default_lifetime(default_lifetime)
                .with_max_lifetime(max_lifetime),
            store_serialized,
            max_items,
        }
    }

    pub fn default_lifetime(&self) -> u64 {
        self.config.default_lifetime
    }

    pub fn store_serialized(&self) -> bool {
        self.store_serialized
    }

    pub fn max_lifetime(&self) -> u64 {
        self.config.max_lifetime
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let state = self.state.read().await;
        state.entries.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn normalize(&self, value: String) -> CacheResult<String> {
        if !self.store_serialized {
            return Ok(value);
        }

        let parsed: serde_json::Value = serde_json::from_str(&value)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        Ok(parsed.to_string())
    }
}

impl Default for ArrayCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for ArrayCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        validate_key(key)?;
        let state = self.state.read().await;

        Ok(state
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        validate_key(key)?;
        let value = self.normalize(value)?;
        // Past the clock's range the item never expires
        let expires_at = self
            .config
            .effective_ttl(ttl)
            .and_then(|d| Instant::now().checked_add(d));

        let mut state = self.state.write().await;
        if self.max_items > 0 && !state.entries.contains_key(key) {
            let now = Instant::now();
            state.entries.retain(|_, entry| !entry.is_expired(now));

            while state.entries.len() >= self.max_items {
                let oldest = state
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.seq)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(oldest) => {
                        state.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        state.next_seq += 1;
        let seq = state.next_seq;
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at,
                seq,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        validate_key(key)?;
        self.state.write().await.entries.remove(key);
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        let mut state = self.state.write().await;
        match self.config.scoped_prefix(prefix) {
            Some(prefix) => state.entries.retain(|key, _| !key.starts_with(&prefix)),
            None => state.entries.clear(),
        }
        Ok(())
    }
}

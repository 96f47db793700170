//! Chain of stores (L1, L2, ... layers).

use crate::error::CacheResult;
use crate::traits::{CacheStore, SharedStore};
use async_trait::async_trait;
use std::time::Duration;
use tracing::trace;

/// Ordered list of stores, fastest first.
///
/// Reads walk the chain and copy a hit back into every earlier store.
/// Writes, deletes and clears go to every store.
pub struct ChainCache {
    stores: Vec<SharedStore>,

    /// Lifetime (seconds) of values copied back into earlier stores, `0` for none
    max_lifetime: u64,
}

impl ChainCache {
    /// Create a chain.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use armature_cache::*;
    /// use std::sync::Arc;
    ///
    /// let l1: SharedStore = Arc::new(ArrayCache::new());
    /// let l2: SharedStore = Arc::new(ArrayCache::new());
    /// let chain = ChainCache::new(vec![l1, l2], 60);
    /// assert_eq!(chain.stores().len(), 2);
    /// ```
    pub fn new(stores: Vec<SharedStore>, max_lifetime: u64) -> Self {
        Self {
            stores,
            max_lifetime,
        }
    }

    pub fn stores(&self) -> &[SharedStore] {
        &self.stores
    }

    pub fn max_lifetime(&self) -> u64 {
        self.max_lifetime
    }

    fn backfill_ttl(&self) -> Option<Duration> {
        (self.max_lifetime > 0).then(|| Duration::from_secs(self.max_lifetime))
    }
}

#[async_trait]
impl CacheStore for ChainCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        for (depth, store) in self.stores.iter().enumerate() {
            if let Some(value) = store.get_json(key).await? {
                trace!(key, depth, "Chain hit");
                for earlier in &self.stores[..depth] {
                    earlier
                        .set_json(key, value.clone(), self.backfill_ttl())
                        .await?;
                }
                return Ok(Some(value));
            }
        }

        Ok(None)
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        // Last store first: it is the source of truth.
        for store in self.stores.iter().rev() {
            store.set_json(key, value.clone(), ttl).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        for store in &self.stores {
            store.delete(key).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        for store in &self.stores {
            if store.exists(key).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        for store in &self.stores {
            store.clear_prefix(prefix).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests_chain {
    use super::*;
    use crate::array::ArrayCache;
    use std::sync::Arc;

    fn layers() -> (Arc<ArrayCache>, Arc<ArrayCache>, ChainCache) {
        let l1 = Arc::new(ArrayCache::new());
        let l2 = Arc::new(ArrayCache::new());
        let chain = ChainCache::new(vec![l1.clone() as SharedStore, l2.clone() as SharedStore], 0);
        (l1, l2, chain)
    }

    #[tokio::test]
    async fn test_chain_cache() {
        let (l1, l2, cache) = layers();

        cache.set_json("test", "\"value\"".to_string(), None).await.unwrap();
        assert!(l1.get_json("test").await.unwrap().is_some());
        assert!(l2.get_json("test").await.unwrap().is_some());

        cache.delete("test").await.unwrap();
        assert_eq!(cache.get_json("test").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_hit_is_copied_to_earlier_stores() {
        let (l1, l2, cache) = layers();

        l2.set_json("key", "\"value\"".to_string(), None).await.unwrap();

        let value = cache.get_json("key").await.unwrap();
        assert_eq!(value, Some("\"value\"".to_string()));
        assert!(l1.get_json("key").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backfill_uses_max_lifetime() {
        let l1 = Arc::new(ArrayCache::new());
        let l2 = Arc::new(ArrayCache::new());
        let cache = ChainCache::new(vec![l1.clone() as SharedStore, l2.clone() as SharedStore], 5);

        l2.set_json("key", "1".to_string(), None).await.unwrap();
        cache.get_json("key").await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!l1.exists("key").await.unwrap());
        assert!(l2.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_reaches_every_store() {
        let (l1, l2, cache) = layers();
        l1.set_json("a", "1".to_string(), None).await.unwrap();
        l2.set_json("b", "2".to_string(), None).await.unwrap();

        cache.clear().await.unwrap();
        assert!(l1.is_empty().await);
        assert!(l2.is_empty().await);
    }
}

//! Couchbase bucket store.

use crate::config::StoreConfig;
use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Document operations of a Couchbase bucket.
///
/// Implemented by whatever client the application connects with.
#[async_trait]
pub trait CouchbaseBucket: Send + Sync {
    async fn get(&self, id: &str) -> CacheResult<Option<String>>;

    /// Insert or replace a document. `expiry` is in seconds, `0` for none.
    async fn upsert(&self, id: &str, value: String, expiry: u32) -> CacheResult<()>;

    async fn remove(&self, id: &str) -> CacheResult<()>;

    /// Remove every document of the bucket.
    async fn flush(&self) -> CacheResult<()>;
}

/// Cache store over a [`CouchbaseBucket`].
pub struct CouchbaseCache {
    bucket: Arc<dyn CouchbaseBucket>,
    config: StoreConfig,
}

impl CouchbaseCache {
    pub fn new(bucket: Arc<dyn CouchbaseBucket>, namespace: impl Into<String>, default_lifetime: u64) -> Self {
        Self {
            bucket,
            config: StoreConfig::new()
                .with_namespace(namespace)
                .with_default_lifetime(default_lifetime),
        }
    }

    pub fn bucket(&self) -> &Arc<dyn CouchbaseBucket> {
        &self.bucket
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn default_lifetime(&self) -> u64 {
        self.config.default_lifetime
    }
}

#[async_trait]
impl CacheStore for CouchbaseCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        let id = self.config.build_key(key)?;
        self.bucket.get(&id).await
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let id = self.config.build_key(key)?;
        let expiry = self
            .config
            .effective_ttl(ttl)
            .map(|ttl| u32::try_from(ttl.as_secs().max(1)).unwrap_or(u32::MAX))
            .unwrap_or(0);
        self.bucket.upsert(&id, value, expiry).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let id = self.config.build_key(key)?;
        self.bucket.remove(&id).await
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        if let Some(prefix) = self.config.scoped_prefix(prefix) {
            return Err(CacheError::Unsupported(format!(
                "Couchbase buckets can only be flushed whole, not the documents under \"{}\"",
                prefix
            )));
        }

        self.bucket.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryBucket {
        docs: Mutex<HashMap<String, (String, u32)>>,
    }

    #[async_trait]
    impl CouchbaseBucket for MemoryBucket {
        async fn get(&self, id: &str) -> CacheResult<Option<String>> {
            Ok(self.docs.lock().get(id).map(|(v, _)| v.clone()))
        }

        async fn upsert(&self, id: &str, value: String, expiry: u32) -> CacheResult<()> {
            self.docs.lock().insert(id.to_string(), (value, expiry));
            Ok(())
        }

        async fn remove(&self, id: &str) -> CacheResult<()> {
            self.docs.lock().remove(id);
            Ok(())
        }

        async fn flush(&self) -> CacheResult<()> {
            self.docs.lock().clear();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_documents_are_namespaced() {
        let bucket = Arc::new(MemoryBucket::default());
        let cache = CouchbaseCache::new(bucket.clone(), "app", 0);

        cache.set_json("k", "1".to_string(), None).await.unwrap();
        assert_eq!(bucket.docs.lock().get("app:k"), Some(&("1".to_string(), 0)));
        assert_eq!(cache.get_json("k").await.unwrap(), Some("1".to_string()));

        cache.delete("k").await.unwrap();
        assert!(!cache.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_namespaced_clear_keeps_bucket() {
        let bucket = Arc::new(MemoryBucket::default());
        bucket.upsert("other", "1".to_string(), 0).await.unwrap();

        let cache = CouchbaseCache::new(bucket.clone(), "app", 0);
        assert!(matches!(cache.clear().await, Err(CacheError::Unsupported(_))));
        assert!(bucket.docs.lock().contains_key("other"));

        CouchbaseCache::new(bucket.clone(), "", 0).clear().await.unwrap();
        assert!(bucket.docs.lock().is_empty());
    }

    #[tokio::test]
    async fn test_default_lifetime_becomes_expiry() {
        let bucket = Arc::new(MemoryBucket::default());
        let cache = CouchbaseCache::new(bucket.clone(), "", 120);

        cache.set_json("a", "1".to_string(), None).await.unwrap();
        cache
            .set_json("b", "2".to_string(), Some(Duration::from_secs(5)))
            .await
            .unwrap();

        let docs = bucket.docs.lock();
        assert_eq!(docs["a"].1, 120);
        assert_eq!(docs["b"].1, 5);
    }
}

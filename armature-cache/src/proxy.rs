//! Namespacing proxy in front of another store.

use crate::config::StoreConfig;
use crate::error::CacheResult;
use crate::traits::{CacheStore, SharedStore};
use async_trait::async_trait;
use std::time::Duration;

/// Adds a namespace and a default lifetime to a wrapped store.
///
/// Clearing removes the proxy's namespace from the wrapped store, which must
/// support [`CacheStore::clear_prefix`] when a namespace is set.
pub struct ProxyCache {
    inner: SharedStore,
    config: StoreConfig,
}

impl ProxyCache {
    pub fn new(inner: SharedStore, namespace: impl Into<String>, default_lifetime: u64) -> Self {
        Self {
            inner,
            config: StoreConfig::new()
                .with_namespace(namespace)
                .with_default_lifetime(default_lifetime),
        }
    }

    pub fn inner(&self) -> &SharedStore {
        &self.inner
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn default_lifetime(&self) -> u64 {
        self.config.default_lifetime
    }
}

#[async_trait]
impl CacheStore for ProxyCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        let key = self.config.build_key(key)?;
        self.inner.get_json(&key).await
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let key = self.config.build_key(key)?;
        let ttl = self.config.effective_ttl(ttl);
        self.inner.set_json(&key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let key = self.config.build_key(key)?;
        self.inner.delete(&key).await
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        match self.config.scoped_prefix(prefix) {
            Some(prefix) => self.inner.clear_prefix(&prefix).await,
            None => self.inner.clear().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayCache;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_keys_are_namespaced_in_inner_store() {
        let inner: SharedStore = Arc::new(ArrayCache::new());
        let proxy = ProxyCache::new(inner.clone(), "users", 0);

        proxy.set_json("42", "\"alice\"".to_string(), None).await.unwrap();

        assert_eq!(
            inner.get_json("users:42").await.unwrap(),
            Some("\"alice\"".to_string())
        );
        assert_eq!(proxy.get_json("42").await.unwrap(), Some("\"alice\"".to_string()));

        proxy.delete("42").await.unwrap();
        assert!(!inner.exists("users:42").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_keeps_keys_outside_namespace() {
        let inner: SharedStore = Arc::new(ArrayCache::new());
        inner.set_json("other", "1".to_string(), None).await.unwrap();

        let proxy = ProxyCache::new(inner.clone(), "p", 0);
        proxy.set_json("k", "2".to_string(), None).await.unwrap();
        proxy.clear().await.unwrap();

        assert!(!proxy.exists("k").await.unwrap());
        assert!(inner.exists("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_nested_proxies_clear_their_own_namespace() {
        let inner: SharedStore = Arc::new(ArrayCache::new());
        let outer: SharedStore = Arc::new(ProxyCache::new(inner.clone(), "app", 0));
        let users = ProxyCache::new(outer.clone(), "users", 0);

        outer.set_json("config", "1".to_string(), None).await.unwrap();
        users.set_json("42", "2".to_string(), None).await.unwrap();
        users.clear().await.unwrap();

        assert!(inner.exists("app:config").await.unwrap());
        assert!(!inner.exists("app:users:42").await.unwrap());
    }

    #[tokio::test]
    async fn test_without_namespace_passes_keys_through() {
        let inner: SharedStore = Arc::new(ArrayCache::new());
        let proxy = ProxyCache::new(inner.clone(), "", 0);

        proxy.set_json("k", "1".to_string(), None).await.unwrap();
        assert!(inner.exists("k").await.unwrap());
    }
}

//! Simple key-value view over any cache store.

use crate::error::CacheResult;
use crate::helpers;
use crate::traits::SharedStore;
use futures::future::try_join_all;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::time::Duration;

/// Typed key-value cache over a shared store.
///
/// Values are serialized with `serde_json`; every call goes straight to the
/// wrapped store, so a `SimpleCache` and its store always agree.
#[derive(Clone)]
pub struct SimpleCache {
    store: SharedStore,
}

impl SimpleCache {
    /// Wrap a store.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use armature_cache::*;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> CacheResult<()> {
    /// let cache = SimpleCache::new(Arc::new(ArrayCache::new()));
    /// cache.set("answer", &42, None).await?;
    /// assert_eq!(cache.get::<i32>("answer").await?, Some(42));
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Get the wrapped store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Get a typed value from the cache.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        helpers::get(self.store.as_ref(), key).await
    }

    /// Get a typed value, or `default` on a miss.
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> CacheResult<T> {
        Ok(self.get(key).await?.unwrap_or(default))
    }

    /// Set a typed value in the cache.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        helpers::set(self.store.as_ref(), key, value, ttl).await
    }

    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        self.store.delete(key).await
    }

    /// Clear all keys.
    pub async fn clear(&self) -> CacheResult<()> {
        self.store.clear().await
    }

    pub async fn has(&self, key: &str) -> CacheResult<bool> {
        self.store.exists(key).await
    }

    /// Get several typed values; misses map to `None`.
    pub async fn get_multiple<T: DeserializeOwned>(
        &self,
        keys: &[&str],
    ) -> CacheResult<HashMap<String, Option<T>>> {
        let values = try_join_all(keys.iter().map(|key| self.get::<T>(key))).await?;
        Ok(keys
            .iter()
            .map(|key| key.to_string())
            .zip(values)
            .collect())
    }

    /// Set several typed values with one TTL.
    pub async fn set_multiple<T: Serialize>(
        &self,
        items: &[(&str, T)],
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        try_join_all(items.iter().map(|(key, value)| self.set(key, value, ttl))).await?;
        Ok(())
    }

    pub async fn delete_multiple(&self, keys: &[&str]) -> CacheResult<()> {
        self.store.delete_many(keys).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayCache;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u32,
        name: String,
    }

    fn cache() -> SimpleCache {
        SimpleCache::new(Arc::new(ArrayCache::new()))
    }

    #[tokio::test]
    async fn test_typed_values() {
        let cache = cache();
        let user = User {
            id: 1,
            name: "Alice".to_string(),
        };

        cache.set("user_1", &user, None).await.unwrap();
        assert_eq!(cache.get::<User>("user_1").await.unwrap(), Some(user));
        assert!(cache.has("user_1").await.unwrap());

        cache.delete("user_1").await.unwrap();
        assert!(!cache.has("user_1").await.unwrap());
        assert_eq!(cache.get_or("user_1", 7).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_multiple() {
        let cache = cache();
        cache
            .set_multiple(&[("a", 1), ("b", 2)], None)
            .await
            .unwrap();

        let values = cache.get_multiple::<i32>(&["a", "b", "c"]).await.unwrap();
        assert_eq!(values["a"], Some(1));
        assert_eq!(values["b"], Some(2));
        assert_eq!(values["c"], None);

        cache.delete_multiple(&["a", "b"]).await.unwrap();
        assert!(!cache.has("a").await.unwrap());
        assert!(!cache.has("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_shares_store() {
        let store: SharedStore = Arc::new(ArrayCache::new());
        let cache = SimpleCache::new(store.clone());

        store.set_json("k", "\"v\"".to_string(), None).await.unwrap();
        assert_eq!(cache.get::<String>("k").await.unwrap(), Some("v".to_string()));

        cache.clear().await.unwrap();
        assert!(!store.exists("k").await.unwrap());
    }
}

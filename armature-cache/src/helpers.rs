//! Typed helpers over any [`CacheStore`].

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Get a typed value from the cache.
pub async fn get<S, T>(store: &S, key: &str) -> CacheResult<Option<T>>
where
    S: CacheStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get_json(key).await? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| CacheError::Deserialization(e.to_string())),
        None => Ok(None),
    }
}

/// Set a typed value in the cache.
pub async fn set<S, T>(store: &S, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()>
where
    S: CacheStore + ?Sized,
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value)
        .map_err(|e| CacheError::Serialization(e.to_string()))?;
    store.set_json(key, json, ttl).await
}

/// Fetch a value, creating and storing it on a miss.
///
/// If the key exists, returns the cached value.
/// If not, calls the factory function, caches the result, and returns it.
pub async fn remember<S, T, F, Fut>(
    store: &S,
    key: &str,
    ttl: Option<Duration>,
    factory: F,
) -> CacheResult<T>
where
    S: CacheStore + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = CacheResult<T>>,
{
    if let Some(value) = get(store, key).await? {
        return Ok(value);
    }

    let value = factory().await?;
    set(store, key, &value, ttl).await?;
    Ok(value)
}

/// Remember a value without TTL; the store's default lifetime still applies.
pub async fn remember_forever<S, T, F, Fut>(store: &S, key: &str, factory: F) -> CacheResult<T>
where
    S: CacheStore + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = CacheResult<T>>,
{
    remember(store, key, None, factory).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_remember_calls_factory_once() {
        let cache = ArrayCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: u32 = remember(&cache, "answer", None, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            })
            .await
            .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_reports_bad_payload() {
        let cache = ArrayCache::new();
        cache
            .set_json("n", "\"text\"".to_string(), None)
            .await
            .unwrap();

        let result: CacheResult<Option<u32>> = get(&cache, "n").await;
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }
}

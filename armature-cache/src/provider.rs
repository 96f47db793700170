//! Store over a blocking key-value cache provider.

use crate::config::StoreConfig;
use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Blocking cache provider, e.g. a client library without async support.
///
/// Calls are made from `spawn_blocking`.
pub trait CacheProvider: Send + Sync {
    fn fetch(&self, id: &str) -> CacheResult<Option<String>>;

    /// Store `data`; `lifetime` is in seconds, `0` for none.
    fn save(&self, id: &str, data: String, lifetime: u64) -> CacheResult<()>;

    fn delete(&self, id: &str) -> CacheResult<()>;

    /// Delete every entry of the provider's own namespace.
    fn delete_all(&self) -> CacheResult<()>;

    /// Delete every entry the provider can reach.
    fn flush_all(&self) -> CacheResult<()>;
}

/// Cache store over a [`CacheProvider`].
///
/// Clearing a namespaced store calls [`CacheProvider::delete_all`], so it
/// covers the provider's own namespace rather than this store's prefix.
pub struct ProviderCache {
    provider: Arc<dyn CacheProvider>,
    config: StoreConfig,
}

impl ProviderCache {
    pub fn new(provider: Arc<dyn CacheProvider>, namespace: impl Into<String>, default_lifetime: u64) -> Self {
        Self {
            provider,
            config: StoreConfig::new()
                .with_namespace(namespace)
                .with_default_lifetime(default_lifetime),
        }
    }

    pub fn provider(&self) -> &Arc<dyn CacheProvider> {
        &self.provider
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn default_lifetime(&self) -> u64 {
        self.config.default_lifetime
    }

    async fn blocking<T, F>(&self, op: F) -> CacheResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CacheProvider) -> CacheResult<T> + Send + 'static,
    {
        let provider = self.provider.clone();
        tokio::task::spawn_blocking(move || op(provider.as_ref())).await?
    }
}

#[async_trait]
impl CacheStore for ProviderCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        let id = self.config.build_key(key)?;
        self.blocking(move |provider| provider.fetch(&id)).await
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let id = self.config.build_key(key)?;
        let lifetime = self
            .config
            .effective_ttl(ttl)
            .map(|ttl| ttl.as_secs().max(1))
            .unwrap_or(0);
        self.blocking(move |provider| provider.save(&id, value, lifetime))
            .await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let id = self.config.build_key(key)?;
        self.blocking(move |provider| provider.delete(&id)).await
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        if !prefix.is_empty() {
            return Err(CacheError::Unsupported(format!(
                "cache providers cannot clear the keys under \"{}\"",
                prefix
            )));
        }

        if self.config.namespace.is_empty() {
            self.blocking(|provider| provider.flush_all()).await
        } else {
            self.blocking(|provider| provider.delete_all()).await
        }
    }
}

//! Memcached cache implementation.

use crate::config::{StoreConfig, unix_now};
use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use memcache::MemcacheError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Expirations above this many seconds are read by memcached as Unix timestamps.
const RELATIVE_EXPIRATION_LIMIT: u64 = 60 * 60 * 24 * 30;

/// Lazily connected Memcached client.
///
/// Note: The `memcache` crate doesn't have native async support,
/// so the client sits behind tokio's Mutex and every call runs in spawn_blocking.
/// The first call opens the connection.
#[derive(Clone)]
pub struct MemcachedClient {
    servers: Vec<String>,
    prefix_key: String,
    client: Arc<Mutex<Option<memcache::Client>>>,
}

impl MemcachedClient {
    /// Create a client for one or more server URLs.
    ///
    /// Plain "host:port" addresses get the `memcache://` scheme.
    pub fn new<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            servers: servers
                .into_iter()
                .map(|s| Self::parse_memcached_url(&s.into()))
                .collect(),
            prefix_key: String::new(),
            client: Arc::new(Mutex::new(None)),
        }
    }

    /// Prefix prepended to every key sent to the servers.
    pub fn with_prefix_key(mut self, prefix_key: impl Into<String>) -> Self {
        self.prefix_key = prefix_key.into();
        self
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    pub fn prefix_key(&self) -> &str {
        &self.prefix_key
    }

    fn parse_memcached_url(url: &str) -> String {
        if url.contains("://") {
            url.to_string()
        } else {
            format!("memcache://{}", url)
        }
    }

    async fn run<T, F>(&self, op: F) -> CacheResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&memcache::Client) -> Result<T, MemcacheError> + Send + 'static,
    {
        if self.servers.is_empty() {
            return Err(CacheError::Connection("no Memcached servers configured".to_string()));
        }

        let servers = self.servers.clone();
        let slot = self.client.clone();

        tokio::task::spawn_blocking(move || {
            let mut slot = slot.blocking_lock();
            if slot.is_none() {
                debug!(servers = ?servers, "Connecting to Memcached");
                let client = memcache::Client::connect(servers)
                    .map_err(|e| CacheError::Connection(format!("Failed to connect: {}", e)))?;
                *slot = Some(client);
            }

            match slot.as_ref() {
                Some(client) => op(client).map_err(CacheError::from),
                None => Err(CacheError::Connection("Memcached client unavailable".to_string())),
            }
        })
        .await?
    }
}

/// Memcached cache store.
#[derive(Clone)]
pub struct MemcachedCache {
    client: MemcachedClient,
    config: StoreConfig,
}

impl MemcachedCache {
    /// Create a new Memcached cache instance.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use armature_cache::*;
    ///
    /// let client = MemcachedClient::new(["localhost:11211"]);
    /// let cache = MemcachedCache::new(client, "app", 0);
    /// ```
    pub fn new(client: MemcachedClient, namespace: impl Into<String>, default_lifetime: u64) -> Self {
        Self {
            client,
            config: StoreConfig::new()
                .with_namespace(namespace)
                .with_default_lifetime(default_lifetime),
        }
    }

    pub fn client(&self) -> &MemcachedClient {
        &self.client
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn default_lifetime(&self) -> u64 {
        self.config.default_lifetime
    }

    /// Build the full key with prefix.
    fn build_key(&self, key: &str) -> CacheResult<String> {
        Ok(format!("{}{}", self.client.prefix_key, self.config.build_key(key)?))
    }

    /// Convert a TTL to a Memcached expiration.
    fn duration_to_expiration(ttl: Option<Duration>) -> u32 {
        let Some(ttl) = ttl else {
            return 0;
        };

        let seconds = ttl.as_secs().max(1);
        let expiration = if seconds > RELATIVE_EXPIRATION_LIMIT {
            unix_now().saturating_add(seconds)
        } else {
            seconds
        };
        u32::try_from(expiration).unwrap_or(u32::MAX)
    }
}

#[async_trait]
impl CacheStore for MemcachedCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        let key = self.build_key(key)?;
        self.client.run(move |client| client.get::<String>(&key)).await
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let key = self.build_key(key)?;
        let expiration = Self::duration_to_expiration(self.config.effective_ttl(ttl));

        self.client
            .run(move |client| client.set(&key, value.as_str(), expiration))
            .await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let key = self.build_key(key)?;
        self.client.run(move |client| client.delete(&key)).await?;
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        // No key enumeration: only a whole-server flush is possible
        if let Some(prefix) = self.config.scoped_prefix(prefix) {
            return Err(CacheError::Unsupported(format!(
                "Memcached cannot clear the keys under \"{}\"",
                prefix
            )));
        }

        self.client.run(|client| client.flush()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memcached_url() {
        let client = MemcachedClient::new(["memcache://localhost:11211", "localhost:11212"]);
        assert_eq!(
            client.servers(),
            &["memcache://localhost:11211", "memcache://localhost:11212"]
        );
    }

    #[test]
    fn test_duration_to_expiration() {
        assert_eq!(MemcachedCache::duration_to_expiration(None), 0);
        assert_eq!(
            MemcachedCache::duration_to_expiration(Some(Duration::from_secs(60))),
            60
        );

        let far = MemcachedCache::duration_to_expiration(Some(Duration::from_secs(
            RELATIVE_EXPIRATION_LIMIT + 1,
        )));
        assert!(u64::from(far) > RELATIVE_EXPIRATION_LIMIT);

        assert_eq!(
            MemcachedCache::duration_to_expiration(Some(Duration::from_secs(u64::MAX))),
            u32::MAX
        );
    }

    #[tokio::test]
    async fn test_namespaced_clear_does_not_flush() {
        // Refused before any connection is opened
        let cache = MemcachedCache::new(MemcachedClient::new(Vec::<String>::new()), "app", 0);
        assert!(matches!(cache.clear().await, Err(CacheError::Unsupported(_))));

        let cache = MemcachedCache::new(MemcachedClient::new(Vec::<String>::new()), "", 0);
        assert!(matches!(
            cache.clear_prefix("users:").await,
            Err(CacheError::Unsupported(_))
        ));
    }

    #[test]
    fn test_keys_carry_prefix_and_namespace() {
        let client = MemcachedClient::new(["localhost:11211"]).with_prefix_key("p_");
        let cache = MemcachedCache::new(client, "app", 0);
        assert_eq!(cache.build_key("user").unwrap(), "p_app:user");
    }

    #[tokio::test]
    async fn test_no_servers_is_connection_error() {
        let cache = MemcachedCache::new(MemcachedClient::new(Vec::<String>::new()), "", 0);
        assert!(matches!(
            cache.get_json("k").await,
            Err(CacheError::Connection(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires Memcached"]
    async fn test_memcached_round_trip() {
        let cache = MemcachedCache::new(MemcachedClient::new(["localhost:11211"]), "armature_test", 0);
        cache.set_json("k", "\"v\"".to_string(), None).await.unwrap();
        assert_eq!(cache.get_json("k").await.unwrap(), Some("\"v\"".to_string()));
    }
}

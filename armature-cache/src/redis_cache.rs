//! Redis cache implementation.

use crate::config::StoreConfig;
use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisResult, aio::ConnectionManager};
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

const SCAN_BATCH: usize = 500;

/// Redis client handle plus the timeouts used when talking to it.
///
/// Creating a handle does no I/O; the connection is opened on first use.
#[derive(Debug, Clone)]
pub struct RedisConnection {
    client: Client,
    connect_timeout: Option<Duration>,
    response_timeout: Option<Duration>,
}

impl RedisConnection {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            connect_timeout: None,
            response_timeout: None,
        }
    }

    /// Parse a connection URL (e.g., "redis://localhost:6379/0").
    pub fn open(dsn: &str) -> CacheResult<Self> {
        let client = Client::open(dsn).map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self::new(client))
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the per-command response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout
    }
}

impl From<Client> for RedisConnection {
    fn from(client: Client) -> Self {
        Self::new(client)
    }
}

/// Redis cache store.
pub struct RedisCache {
    connection: RedisConnection,
    manager: OnceCell<ConnectionManager>,
    config: StoreConfig,
}

impl RedisCache {
    /// Create a new Redis cache instance.
    ///
    /// # Arguments
    ///
    /// * `connection` - Client handle
    /// * `namespace` - Key prefix, empty for none
    /// * `default_lifetime` - Seconds applied to writes without TTL, `0` for none
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use armature_cache::*;
    ///
    /// # fn main() -> Result<(), CacheError> {
    /// let connection = RedisConnection::open("redis://localhost:6379")?;
    /// let cache = RedisCache::new(connection, "app", 300);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(connection: RedisConnection, namespace: impl Into<String>, default_lifetime: u64) -> Self {
        Self {
            connection,
            manager: OnceCell::new(),
            config: StoreConfig::new()
                .with_namespace(namespace)
                .with_default_lifetime(default_lifetime),
        }
    }

    /// Get the underlying client handle.
    pub fn connection(&self) -> &RedisConnection {
        &self.connection
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn default_lifetime(&self) -> u64 {
        self.config.default_lifetime
    }

    async fn manager(&self) -> CacheResult<ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                debug!(timeout = ?self.connection.connect_timeout, "Opening Redis connection");
                let connect = ConnectionManager::new(self.connection.client.clone());
                let result = match self.connection.connect_timeout {
                    Some(limit) => tokio::time::timeout(limit, connect)
                        .await
                        .map_err(|_| CacheError::Timeout)?,
                    None => connect.await,
                };
                result.map_err(|e| CacheError::Connection(e.to_string()))
            })
            .await?;

        Ok(manager.clone())
    }

    async fn bounded<T, F>(&self, command: F) -> CacheResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match self.connection.response_timeout {
            Some(limit) => Ok(tokio::time::timeout(limit, command)
                .await
                .map_err(|_| CacheError::Timeout)??),
            None => Ok(command.await?),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        let key = self.config.build_key(key)?;
        let mut conn = self.manager().await?;

        let value: Option<String> = self.bounded(conn.get(&key)).await?;
        Ok(value)
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let key = self.config.build_key(key)?;
        let mut conn = self.manager().await?;

        if let Some(ttl) = self.config.effective_ttl(ttl) {
            let ttl_seconds = ttl.as_secs().max(1);
            let _: () = self.bounded(conn.set_ex(&key, value, ttl_seconds)).await?;
        } else {
            let _: () = self.bounded(conn.set(&key, value)).await?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let key = self.config.build_key(key)?;
        let mut conn = self.manager().await?;
        let _: () = self.bounded(conn.del(&key)).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let key = self.config.build_key(key)?;
        let mut conn = self.manager().await?;
        let exists: bool = self.bounded(conn.exists(&key)).await?;
        Ok(exists)
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        let mut conn = self.manager().await?;

        let Some(prefix) = self.config.scoped_prefix(prefix) else {
            let cmd = redis::cmd("FLUSHDB");
            let _: () = self.bounded(cmd.query_async(&mut conn)).await?;
            return Ok(());
        };

        let pattern = format!("{}*", glob_escape(&prefix));
        let mut cursor: u64 = 0;
        loop {
            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH);
            let (next, keys): (u64, Vec<String>) = self.bounded(cmd.query_async(&mut conn)).await?;

            if !keys.is_empty() {
                let _: () = self.bounded(conn.del(&keys)).await?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(())
    }
}

/// Escape Redis glob metacharacters.
fn glob_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_escape() {
        assert_eq!(glob_escape("app:"), "app:");
        assert_eq!(glob_escape("a*b?[c]:"), "a\\*b\\?\\[c\\]:");
    }

    #[test]
    fn test_connection_handle_does_not_connect() {
        let connection = RedisConnection::open("redis://127.0.0.1:1/")
            .unwrap()
            .with_connect_timeout(Duration::from_secs(30))
            .with_response_timeout(Duration::from_secs(2));

        assert_eq!(connection.connect_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(connection.response_timeout(), Some(Duration::from_secs(2)));

        let cache = RedisCache::new(connection, "app", 60);
        assert_eq!(cache.namespace(), "app");
        assert_eq!(cache.default_lifetime(), 60);
    }

    #[test]
    fn test_invalid_dsn() {
        assert!(matches!(
            RedisConnection::open("not a url"),
            Err(CacheError::Connection(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_redis_round_trip() {
        let connection = RedisConnection::open("redis://localhost:6379").unwrap();
        let cache = RedisCache::new(connection, "armature_test", 0);

        cache.set_json("k", "\"v\"".to_string(), None).await.unwrap();
        assert_eq!(cache.get_json("k").await.unwrap(), Some("\"v\"".to_string()));

        cache.clear().await.unwrap();
        assert_eq!(cache.get_json("k").await.unwrap(), None);
    }
}

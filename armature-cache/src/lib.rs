//! Cache adapters for the Armature framework.
//!
//! Every adapter implements [`CacheStore`], an async, object-safe capability
//! (fetch, persist, delete, clear) shared between services as [`SharedStore`].
//!
//! # Adapters
//!
//! - [`ArrayCache`] - in-process map with optional item limit
//! - [`SharedMemoryCache`] - process-wide segment partitioned by namespace
//! - [`FilesystemCache`] / [`MemoizedFilesCache`] - one file per key
//! - [`StaticArrayCache`] - read-only snapshot in front of a backup store
//! - [`ProxyCache`] / [`ChainCache`] - composition of other stores
//! - [`RedisCache`], [`MemcachedCache`], [`CouchbaseCache`] - network stores
//! - [`DatabaseCache`] - one SQL table through `sqlx`
//! - [`ProviderCache`] - any blocking [`CacheProvider`]
//!
//! [`SimpleCache`] offers a typed key-value view over any of them.
//!
//! # Examples
//!
//! ## Multi-tier Caching
//!
//! ```no_run
//! use armature_cache::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), CacheError> {
//! let l1: SharedStore = Arc::new(ArrayCache::new());
//! let l2: SharedStore = Arc::new(FilesystemCache::new("app", 0, "/var/cache/app")?);
//!
//! let chain = ChainCache::new(vec![l1, l2], 300);
//!
//! // Reads fall back to L2 and refill L1
//! chain.set_json("key", "\"value\"".to_string(), Some(Duration::from_secs(60))).await?;
//! let value = chain.get_json("key").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Redis Cache
//!
//! ```no_run
//! use armature_cache::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CacheError> {
//!     let connection = RedisConnection::open("redis://localhost:6379")?;
//!     let cache = SimpleCache::new(Arc::new(RedisCache::new(connection, "app", 3600)));
//!
//!     cache.set("user:1", &"Alice", None).await?;
//!     Ok(())
//! }
//! ```

pub mod array;
pub mod chain;
pub mod config;
pub mod couchbase;
pub mod database;
pub mod error;
pub mod filesystem;
pub mod helpers;
pub mod memcached_cache;
pub mod memoized_files;
pub mod provider;
pub mod proxy;
pub mod redis_cache;
pub mod shared_memory;
pub mod simple;
pub mod static_array;
pub mod traits;

pub use array::ArrayCache;
pub use chain::ChainCache;
pub use config::{
    NAMESPACE_SEPARATOR, RESERVED_CHARACTERS, StoreConfig, validate_key, validate_namespace,
};
pub use couchbase::{CouchbaseBucket, CouchbaseCache};
pub use database::{DatabaseCache, DatabaseSchema};
pub use error::{CacheError, CacheResult};
pub use filesystem::FilesystemCache;
pub use helpers::*;
pub use memcached_cache::{MemcachedCache, MemcachedClient};
pub use memoized_files::MemoizedFilesCache;
pub use provider::{CacheProvider, ProviderCache};
pub use proxy::ProxyCache;
pub use redis_cache::{RedisCache, RedisConnection};
pub use shared_memory::SharedMemoryCache;
pub use simple::SimpleCache;
pub use static_array::StaticArrayCache;
pub use traits::{CacheStore, SharedStore};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::simple::SimpleCache;
    pub use crate::traits::{CacheStore, SharedStore};
    pub use crate::{
        ArrayCache, ChainCache, DatabaseCache, FilesystemCache, MemcachedCache, ProxyCache,
        RedisCache,
    };
}

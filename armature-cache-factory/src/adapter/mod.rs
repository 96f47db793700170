//! Per-backend adapter factories.
//!
//! Each factory reads its options through a typed `*Options`/`*Params`
//! struct, resolves what it needs from the container, and returns a
//! [`SharedStore`].

use crate::error::{FactoryError, FactoryResult};
use crate::locator::ContainerAware;
use crate::options::Options;
use armature_cache::{CacheError, SharedStore, validate_namespace};

pub mod apcu;
pub mod array;
pub mod chain;
pub mod couchbase;
pub mod doctrine;
pub mod filesystem;
pub mod memcached;
pub mod pdo;
pub mod php_array;
pub mod php_files;
pub mod proxy;
pub mod redis;

pub use apcu::{ApcuAdapterFactory, ApcuOptions};
pub use array::{ArrayAdapterFactory, ArrayOptions};
pub use chain::{ChainAdapterFactory, ChainOptions};
pub use couchbase::{CouchbaseAdapterFactory, CouchbaseParams};
pub use doctrine::{DoctrineAdapterFactory, DoctrineOptions};
pub use filesystem::{FilesystemAdapterFactory, FilesystemOptions};
pub use memcached::{MemcachedAdapterFactory, MemcachedParams};
pub use pdo::{PdoAdapterFactory, PdoParams};
pub use php_array::{PhpArrayAdapterFactory, PhpArrayOptions};
pub use php_files::PhpFilesAdapterFactory;
pub use proxy::{ProxyAdapterFactory, ProxyOptions};
pub use redis::{RedisAdapterFactory, RedisParams};

/// Builds one kind of adapter from an options map.
pub trait AdapterFactory: Send {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore>;

    /// The container hook of factories that resolve services.
    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        None
    }
}

/// Seconds from a coerced integer option; negative values count as `0`.
pub(crate) fn seconds(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Reject a `namespace` option holding reserved characters.
pub(crate) fn check_namespace(namespace: &str) -> FactoryResult<()> {
    validate_namespace(namespace).map_err(store_config_error)
}

/// A store refusing its settings is a configuration problem.
pub(crate) fn store_config_error(err: CacheError) -> FactoryError {
    match err {
        CacheError::Config(message) => FactoryError::InvalidConfig(message),
        other => FactoryError::Cache(other),
    }
}

/// Whether a coerced string option is empty (`""` or `"0"`).
pub(crate) fn is_blank(value: &str) -> bool {
    value.is_empty() || value == "0"
}

//! Configuration-driven cache factories for the Armature framework.
//!
//! Caches are declared under a `cache` tree, one entry per named cache:
//!
//! ```json
//! {
//!   "cache": {
//!     "default": { "type": "array" },
//!     "sessions": { "type": "redis", "options": { "dsn": "redis://localhost", "namespace": "sess" } },
//!     "layered": { "type": "chain", "options": { "adapters": ["cache.default", "cache.sessions"] } }
//!   }
//! }
//! ```
//!
//! The tree is found through a [`ServiceLocator`]: a `cache` parameter first,
//! then the `config` service, then the `settings` service. [`CacheFactory`]
//! reads one entry, dispatches its `type` to an adapter factory and returns
//! the adapter as a [`SharedStore`](armature_cache::SharedStore).
//!
//! # Types
//!
//! `apcu`, `array`, `chain`, `couchbase`, `filesystem`, `memcached`, `pdo`,
//! `phparray`, `phpfiles`, `proxy` and `redis`, matched case-insensitively.
//! Other names are looked up in a [`FactoryRegistry`].
//!
//! # Services
//!
//! ```
//! use armature_cache::{SharedStore, SimpleCache};
//! use armature_cache_factory::{ServiceContainer, register_cache_services, resolve};
//! use serde_json::json;
//!
//! let container = ServiceContainer::new();
//! container.set_config(json!({"cache": {"default": {"type": "array"}}}));
//! register_cache_services(&container);
//!
//! let store = resolve::<SharedStore>(&container, "cache.default").unwrap();
//! let simple = resolve::<SimpleCache>(&container, "simple-cache.default").unwrap();
//! # let _ = (store, simple);
//! ```

pub mod adapter;
pub mod config;
pub mod connection;
pub mod container;
pub mod error;
pub mod factory;
pub mod loader;
pub mod locator;
pub mod options;
pub mod registry;
pub mod service;
pub mod testing;

pub use adapter::{
    AdapterFactory, ApcuAdapterFactory, ApcuOptions, ArrayAdapterFactory, ArrayOptions,
    ChainAdapterFactory, ChainOptions, CouchbaseAdapterFactory, CouchbaseParams,
    DoctrineAdapterFactory, DoctrineOptions, FilesystemAdapterFactory, FilesystemOptions,
    MemcachedAdapterFactory, MemcachedParams, PdoAdapterFactory, PdoParams,
    PhpArrayAdapterFactory, PhpArrayOptions, PhpFilesAdapterFactory, ProxyAdapterFactory,
    ProxyOptions, RedisAdapterFactory, RedisParams,
};
pub use config::{AdapterConfig, CACHE_KEY, DEFAULT_CONFIG_KEY, adapter_config, cache_tree};
pub use connection::{ConnectionBuilder, CouchbaseConnector, DefaultConnectionBuilder};
pub use container::{AbstractFactory, ServiceContainer};
pub use error::{FactoryError, FactoryResult};
pub use factory::CacheFactory;
pub use loader::{CONFIG_PATH_ENV, ConfigLoader, FileFormat};
pub use locator::{
    ContainerAware, ContainerSlot, ParameterBag, Service, ServiceLocator, resolve, resolve_cloned,
};
pub use options::{Options, OptionsExt};
pub use registry::{BackendType, FactoryId, FactoryRegistry};
pub use service::{
    CacheServiceAbstractFactory, register_cache_services, register_cache_services_with,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::adapter::AdapterFactory;
    pub use crate::container::ServiceContainer;
    pub use crate::error::{FactoryError, FactoryResult};
    pub use crate::factory::CacheFactory;
    pub use crate::locator::{ServiceLocator, resolve, resolve_cloned};
    pub use crate::registry::FactoryRegistry;
    pub use crate::service::register_cache_services;
}

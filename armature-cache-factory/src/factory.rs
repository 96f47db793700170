//! Building adapters from named configuration entries.

use crate::config::{DEFAULT_CONFIG_KEY, adapter_config};
use crate::connection::{ConnectionBuilder, DefaultConnectionBuilder};
use crate::error::{FactoryError, FactoryResult};
use crate::locator::ServiceLocator;
use crate::options::Options;
use crate::registry::FactoryRegistry;
use armature_cache::SharedStore;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds the adapter configured under one key of the cache tree.
///
/// # Examples
///
/// ```
/// use armature_cache_factory::{CacheFactory, ServiceContainer};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let container = ServiceContainer::new();
/// container.set_config(json!({"cache": {"default": {"type": "array"}}}));
///
/// let store = CacheFactory::default().create(Arc::new(container)).unwrap();
/// # let _ = store;
/// ```
#[derive(Clone)]
pub struct CacheFactory {
    config_key: String,
    registry: Arc<FactoryRegistry>,
    connections: Arc<dyn ConnectionBuilder>,
}

impl Default for CacheFactory {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_KEY)
    }
}

impl fmt::Debug for CacheFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheFactory")
            .field("config_key", &self.config_key)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl CacheFactory {
    pub fn new(config_key: impl Into<String>) -> Self {
        Self {
            config_key: config_key.into(),
            registry: Arc::new(FactoryRegistry::new()),
            connections: Arc::new(DefaultConnectionBuilder::new()),
        }
    }

    /// Use `registry` for custom type names.
    pub fn with_registry(mut self, registry: FactoryRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Use `connections` to open DSN-configured backends.
    pub fn with_connection_builder(mut self, connections: Arc<dyn ConnectionBuilder>) -> Self {
        self.connections = connections;
        self
    }

    /// The same factory reading another entry of the cache tree.
    pub fn with_config_key(&self, config_key: impl Into<String>) -> Self {
        Self {
            config_key: config_key.into(),
            ..self.clone()
        }
    }

    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    /// Resolve this factory's configuration entry and build its adapter.
    pub fn create(&self, container: Arc<dyn ServiceLocator>) -> FactoryResult<SharedStore> {
        let config = adapter_config(container.as_ref(), &self.config_key)?;
        self.build(container, &config.type_name, &config.options)
    }

    /// Build an adapter of `type_name` from `options`.
    pub fn build(
        &self,
        container: Arc<dyn ServiceLocator>,
        type_name: &str,
        options: &Options,
    ) -> FactoryResult<SharedStore> {
        let id = self.registry.resolve(type_name).ok_or_else(|| {
            FactoryError::InvalidConfig(format!(
                "Unable to locate a factory by the name of: {}",
                type_name
            ))
        })?;

        let mut factory = self.registry.instantiate(&id, self.connections.clone())?;
        if let Some(aware) = factory.container_aware() {
            aware.set_container(container);
        }

        debug!(config_key = %self.config_key, factory = ?id, "Creating cache adapter");
        factory.create(options)
    }

    /// Build the adapter configured under `name`.
    ///
    /// A missing container is an [`FactoryError::InvalidContainer`] error.
    pub fn call(name: &str, container: Option<Arc<dyn ServiceLocator>>) -> FactoryResult<SharedStore> {
        let container = container.ok_or_else(|| {
            FactoryError::InvalidContainer(
                "The first argument must be a service locator".to_string(),
            )
        })?;

        Self::new(name).create(container)
    }
}

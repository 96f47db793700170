use super::{AdapterFactory, check_namespace, is_blank, seconds};
use crate::error::{FactoryError, FactoryResult};
use crate::locator::{ContainerAware, ContainerSlot, resolve_cloned};
use crate::options::{Options, OptionsExt};
use armature_cache::{CacheProvider, ProviderCache, SharedStore};
use std::sync::Arc;

/// Options of the provider adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctrineOptions {
    /// Service name of an `Arc<dyn CacheProvider>`
    pub provider: String,
    pub namespace: String,
    pub max_lifetime: i64,
}

impl DoctrineOptions {
    pub fn from_options(options: &Options) -> FactoryResult<Self> {
        let provider = options.string_or("provider", "");
        if is_blank(&provider) {
            return Err(FactoryError::MissingConfig(
                "Missing cache provider service name".to_string(),
            ));
        }

        Ok(Self {
            provider,
            namespace: options.string_or("namespace", ""),
            max_lifetime: options.int_or("maxLifetime", 0),
        })
    }
}

/// Adapter over a blocking [`CacheProvider`] service.
///
/// Not part of the built-in type names; register it to use it:
///
/// ```rust
/// use armature_cache_factory::{DoctrineAdapterFactory, FactoryRegistry};
///
/// let mut registry = FactoryRegistry::new();
/// registry.register_factory("doctrine", DoctrineAdapterFactory::new);
/// ```
#[derive(Clone, Default)]
pub struct DoctrineAdapterFactory {
    container: ContainerSlot,
}

impl DoctrineAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdapterFactory for DoctrineAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let opts = DoctrineOptions::from_options(options)?;
        check_namespace(&opts.namespace)?;
        let provider = resolve_cloned::<Arc<dyn CacheProvider>>(self.container.get()?, &opts.provider)?;

        Ok(Arc::new(ProviderCache::new(
            provider,
            opts.namespace,
            seconds(opts.max_lifetime),
        )))
    }

    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        Some(&mut self.container)
    }
}

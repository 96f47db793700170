//! `cache.<name>` and `simple-cache.<name>` services.

use crate::config::CACHE_KEY;
use crate::container::{AbstractFactory, ServiceContainer};
use crate::error::{FactoryError, FactoryResult};
use crate::factory::CacheFactory;
use crate::locator::{Service, resolve, resolve_cloned};
use armature_cache::{SharedStore, SimpleCache};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Prefix of adapter services.
pub const CACHE_PREFIX: &str = "cache";

/// Prefix of [`SimpleCache`] services.
pub const SIMPLE_CACHE_PREFIX: &str = "simple-cache";

/// Creates configured caches on demand.
///
/// `cache.<name>` resolves to a [`SharedStore`] built from
/// `config["cache"][<name>]`; `simple-cache.<name>` resolves to a
/// [`SimpleCache`] over the `cache.<name>` store.
#[derive(Debug, Clone, Default)]
pub struct CacheServiceAbstractFactory {
    template: CacheFactory,
}

impl CacheServiceAbstractFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build stores with `template`'s registry and connection builder.
    pub fn from_factory(template: CacheFactory) -> Self {
        Self { template }
    }
}

fn split_name(name: &str) -> Option<(&str, &str)> {
    name.split_once('.')
        .filter(|(prefix, _)| *prefix == CACHE_PREFIX || *prefix == SIMPLE_CACHE_PREFIX)
}

impl AbstractFactory for CacheServiceAbstractFactory {
    fn can_create(&self, container: &ServiceContainer, name: &str) -> bool {
        let Some((_, key)) = split_name(name) else {
            return false;
        };

        if !container.has("config") {
            return false;
        }

        resolve::<Value>(container, "config")
            .map(|config| config[CACHE_KEY][key].is_object())
            .unwrap_or(false)
    }

    fn create(&self, container: &ServiceContainer, name: &str) -> FactoryResult<Service> {
        let (prefix, key) = split_name(name)
            .ok_or_else(|| FactoryError::ServiceNotFound(name.to_string()))?;

        if prefix == SIMPLE_CACHE_PREFIX {
            let store = resolve_cloned::<SharedStore>(container, &format!("{}.{}", CACHE_PREFIX, key))?;
            debug!(service = name, "Creating simple cache");
            return Ok(Arc::new(SimpleCache::new(store)));
        }

        let store = self
            .template
            .with_config_key(key)
            .create(Arc::new(container.clone()))?;
        debug!(service = name, "Creating cache service");
        Ok(Arc::new(store))
    }
}

/// Expose every configured cache as `cache.<name>` and `simple-cache.<name>`.
pub fn register_cache_services(container: &ServiceContainer) {
    register_cache_services_with(container, CacheFactory::default());
}

/// Like [`register_cache_services`], building stores with `factory`'s
/// registry and connection builder.
pub fn register_cache_services_with(container: &ServiceContainer, factory: CacheFactory) {
    container.add_abstract_factory(Arc::new(CacheServiceAbstractFactory::from_factory(factory)));
}

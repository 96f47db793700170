use super::AdapterFactory;
use crate::error::{FactoryError, FactoryResult};
use crate::locator::{ContainerAware, ContainerSlot, resolve_cloned};
use crate::options::{self, Options, OptionsExt};
use armature_cache::{ChainCache, SharedStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// Options of the chain adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainOptions {
    /// Service names of the chained adapters, fastest first
    pub adapters: Vec<String>,
    pub max_lifetime: i64,
}

impl ChainOptions {
    /// Read the options; `adapters` must be a list (a map contributes its values).
    pub fn from_options(options: &Options) -> FactoryResult<Self> {
        let adapters = match options.value("adapters") {
            None => Vec::new(),
            Some(Value::Array(names)) => names.iter().map(options::to_string).collect(),
            Some(Value::Object(names)) => names.values().map(options::to_string).collect(),
            Some(_) => {
                return Err(FactoryError::InvalidConfig(
                    "Chain adapters must be a list of cache service names".to_string(),
                ));
            }
        };

        Ok(Self {
            adapters,
            max_lifetime: options.int_or("maxLifetime", 0),
        })
    }
}

#[derive(Clone, Default)]
pub struct ChainAdapterFactory {
    container: ContainerSlot,
}

impl ChainAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdapterFactory for ChainAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let opts = ChainOptions::from_options(options)?;
        let container = self.container.get()?;

        let stores = opts
            .adapters
            .iter()
            .map(|name| {
                trace!(adapter = %name, "Resolving chained cache");
                resolve_cloned::<SharedStore>(container, name)
            })
            .collect::<FactoryResult<Vec<_>>>()?;

        if stores.is_empty() {
            return Err(FactoryError::InvalidConfig(
                "Unable to locate caches to chain from config".to_string(),
            ));
        }

        Ok(Arc::new(ChainCache::new(stores, super::seconds(opts.max_lifetime))))
    }

    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        Some(&mut self.container)
    }
}

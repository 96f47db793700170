use super::{AdapterFactory, check_namespace, is_blank, seconds};
use crate::error::{FactoryError, FactoryResult};
use crate::locator::{ContainerAware, ContainerSlot, resolve_cloned};
use crate::options::{Options, OptionsExt};
use armature_cache::{ProxyCache, SharedStore};
use std::sync::Arc;

/// Options of the proxy adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyOptions {
    /// Service name of the wrapped cache (`psr6Service`)
    pub service: String,
    pub namespace: String,
    pub default_lifetime: i64,
}

impl ProxyOptions {
    pub fn from_options(options: &Options) -> FactoryResult<Self> {
        let service = options.string_or("psr6Service", "");
        if is_blank(&service) {
            return Err(FactoryError::MissingConfig(
                "A cache service is required for the proxy adapter".to_string(),
            ));
        }

        Ok(Self {
            service,
            namespace: options.string_or("namespace", ""),
            default_lifetime: options.int_or("defaultLifetime", 0),
        })
    }
}

#[derive(Clone, Default)]
pub struct ProxyAdapterFactory {
    container: ContainerSlot,
}

impl ProxyAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdapterFactory for ProxyAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let opts = ProxyOptions::from_options(options)?;
        check_namespace(&opts.namespace)?;
        let container = self.container.get()?;

        if !container.has(&opts.service) {
            return Err(FactoryError::InvalidConfig(format!(
                "No cache service found by the name: {}",
                opts.service
            )));
        }

        let inner = resolve_cloned::<SharedStore>(container, &opts.service)?;
        Ok(Arc::new(ProxyCache::new(
            inner,
            opts.namespace,
            seconds(opts.default_lifetime),
        )))
    }

    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        Some(&mut self.container)
    }
}

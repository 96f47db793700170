use super::{AdapterFactory, seconds};
use crate::error::FactoryResult;
use crate::options::{Options, OptionsExt};
use armature_cache::{ArrayCache, SharedStore};
use std::sync::Arc;

/// Options of the in-process array adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayOptions {
    pub default_lifetime: i64,
    pub store_serialized: bool,
    pub max_lifetime: i64,
    pub max_items: i64,
}

impl Default for ArrayOptions {
    fn default() -> Self {
        Self {
            default_lifetime: 0,
            store_serialized: true,
            max_lifetime: 0,
            max_items: 0,
        }
    }
}

impl ArrayOptions {
    pub fn from_options(options: &Options) -> Self {
        let defaults = Self::default();
        Self {
            default_lifetime: options.int_or("defaultLifetime", defaults.default_lifetime),
            store_serialized: options.bool_or("storeSerialized", defaults.store_serialized),
            max_lifetime: options.int_or("maxLifetime", defaults.max_lifetime),
            max_items: options.int_or("maxItems", defaults.max_items),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ArrayAdapterFactory;

impl AdapterFactory for ArrayAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let opts = ArrayOptions::from_options(options);
        Ok(Arc::new(ArrayCache::with_options(
            seconds(opts.default_lifetime),
            opts.store_serialized,
            seconds(opts.max_lifetime),
            usize::try_from(opts.max_items).unwrap_or(0),
        )))
    }
}

use super::{AdapterFactory, seconds, store_config_error};
use crate::error::FactoryResult;
use crate::options::{Options, OptionsExt};
use armature_cache::{FilesystemCache, SharedStore};
use std::sync::Arc;

/// Options of the file based adapters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilesystemOptions {
    pub namespace: String,
    pub default_lifetime: i64,
    /// Empty for the system temp directory
    pub directory: String,
}

impl FilesystemOptions {
    pub fn from_options(options: &Options) -> Self {
        Self {
            namespace: options.string_or("namespace", ""),
            default_lifetime: options.int_or("defaultLifetime", 0),
            directory: options.string_or("directory", ""),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemAdapterFactory;

impl AdapterFactory for FilesystemAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let opts = FilesystemOptions::from_options(options);
        let store = FilesystemCache::new(opts.namespace, seconds(opts.default_lifetime), opts.directory)
            .map_err(store_config_error)?;
        Ok(Arc::new(store))
    }
}

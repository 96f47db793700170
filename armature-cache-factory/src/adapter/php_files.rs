use super::filesystem::FilesystemOptions;
use super::{AdapterFactory, seconds, store_config_error};
use crate::error::FactoryResult;
use crate::options::Options;
use armature_cache::{MemoizedFilesCache, SharedStore};
use std::sync::Arc;

/// Memoized file adapter; reads the same options as the filesystem adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhpFilesAdapterFactory;

impl AdapterFactory for PhpFilesAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let opts = FilesystemOptions::from_options(options);
        let store = MemoizedFilesCache::new(opts.namespace, seconds(opts.default_lifetime), opts.directory)
            .map_err(store_config_error)?;
        Ok(Arc::new(store))
    }
}

use super::{AdapterFactory, is_blank};
use crate::error::{FactoryError, FactoryResult};
use crate::locator::{ContainerAware, ContainerSlot, resolve_cloned};
use crate::options::{Options, OptionsExt};
use armature_cache::{SharedStore, StaticArrayCache};
use std::sync::Arc;

/// Options of the static snapshot adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhpArrayOptions {
    /// Service name of the store behind the snapshot
    pub backup_cache: String,
    pub file_path: String,
}

impl PhpArrayOptions {
    /// Read the options; `backupCache` is checked before `filePath`.
    pub fn from_options(options: &Options) -> FactoryResult<Self> {
        let backup_cache = options.string_or("backupCache", "");
        let file_path = options.string_or("filePath", "");

        if is_blank(&backup_cache) {
            return Err(FactoryError::MissingConfig(
                "A backup cache service is required for the php array adapter".to_string(),
            ));
        }

        if is_blank(&file_path) {
            return Err(FactoryError::MissingConfig(
                "A file path is required for the php array adapter".to_string(),
            ));
        }

        Ok(Self {
            backup_cache,
            file_path,
        })
    }
}

#[derive(Clone, Default)]
pub struct PhpArrayAdapterFactory {
    container: ContainerSlot,
}

impl PhpArrayAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdapterFactory for PhpArrayAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let opts = PhpArrayOptions::from_options(options)?;
        let container = self.container.get()?;

        if !container.has(&opts.backup_cache) {
            return Err(FactoryError::InvalidConfig(format!(
                "No service found by the name: {}",
                opts.backup_cache
            )));
        }

        let backup = resolve_cloned::<SharedStore>(container, &opts.backup_cache)?;
        Ok(Arc::new(StaticArrayCache::new(opts.file_path, backup)))
    }

    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        Some(&mut self.container)
    }
}

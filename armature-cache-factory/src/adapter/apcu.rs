use super::{AdapterFactory, check_namespace, is_blank, seconds};
use crate::error::FactoryResult;
use crate::options::{Options, OptionsExt};
use armature_cache::{SharedMemoryCache, SharedStore};
use std::sync::Arc;

/// Options of the shared memory adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApcuOptions {
    pub namespace: String,
    pub default_lifetime: i64,
    /// Only set when the configured version is not empty
    pub version: Option<String>,
}

impl ApcuOptions {
    pub fn from_options(options: &Options) -> Self {
        let version = options.string_or("version", "");
        Self {
            namespace: options.string_or("namespace", ""),
            default_lifetime: options.int_or("defaultLifetime", 0),
            version: (!is_blank(&version)).then_some(version),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ApcuAdapterFactory;

impl AdapterFactory for ApcuAdapterFactory {
    fn create(&self, options: &Options) -> FactoryResult<SharedStore> {
        let opts = ApcuOptions::from_options(options);
        check_namespace(&opts.namespace)?;
        let lifetime = seconds(opts.default_lifetime);

        Ok(match opts.version {
            Some(version) => Arc::new(SharedMemoryCache::with_version(opts.namespace, lifetime, version)),
            None => Arc::new(SharedMemoryCache::new(opts.namespace, lifetime)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let opts = ApcuOptions::from_options(&Options::new());
        assert_eq!(opts.namespace, "");
        assert_eq!(opts.default_lifetime, 0);
        assert_eq!(opts.version, None);
    }

    #[test]
    fn test_version_only_when_not_empty() {
        let mut options = Options::new();
        options.insert("version".to_string(), json!("0"));
        assert_eq!(ApcuOptions::from_options(&options).version, None);

        options.insert("version".to_string(), json!(3));
        assert_eq!(ApcuOptions::from_options(&options).version, Some("3".to_string()));
    }

    #[tokio::test]
    async fn test_create() {
        let mut options = Options::new();
        options.insert("namespace".to_string(), json!("apcu_factory_test"));
        let store = ApcuAdapterFactory.create(&options).unwrap();

        store.set_json("k", "1".to_string(), None).await.unwrap();
        assert_eq!(store.get_json("k").await.unwrap(), Some("1".to_string()));
    }
}

//! Locating the cache configuration through a service locator.

use crate::error::{FactoryError, FactoryResult};
use crate::locator::{ServiceLocator, resolve};
use crate::options::{self, Options};
use serde_json::Value;
use tracing::trace;

/// Key of the cache tree in `config`, `settings` and the parameter bag.
pub const CACHE_KEY: &str = "cache";

/// Entry used when no config key is given.
pub const DEFAULT_CONFIG_KEY: &str = "default";

/// Find the cache configuration tree.
///
/// Tried in order: the `cache` parameter, `config["cache"]`,
/// `settings["cache"]`. A tree missing from a found `config` or `settings`
/// map is returned as `null`.
pub fn cache_tree(locator: &dyn ServiceLocator) -> FactoryResult<Value> {
    if let Some(parameters) = locator.parameters()
        && parameters.has_parameter(CACHE_KEY)
    {
        trace!("Cache configuration from parameter bag");
        return parameters.get_parameter(CACHE_KEY);
    }

    for source in ["config", "settings"] {
        if locator.has(source) {
            trace!(source, "Cache configuration from service");
            let tree = resolve::<Value>(locator, source)?;
            return Ok(tree.get(CACHE_KEY).cloned().unwrap_or(Value::Null));
        }
    }

    Err(FactoryError::MissingConfig(
        "Unable to locate Cache configuration".to_string(),
    ))
}

/// One entry of the cache tree.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    pub type_name: String,
    pub options: Options,
}

impl AdapterConfig {
    /// Read the entry `key` of a cache tree.
    pub fn from_tree(tree: &Value, key: &str) -> FactoryResult<Self> {
        let entry = match tree.get(key) {
            Some(entry) if !options::is_empty(entry) => entry,
            _ => {
                return Err(FactoryError::InvalidConfig(format!(
                    "No config found for adapter: {}",
                    key
                )));
            }
        };

        let Some(entry) = entry.as_object() else {
            return Err(FactoryError::InvalidConfig(format!(
                "Config for adapter {} must be a map",
                key
            )));
        };

        let type_name = match entry.get("type") {
            Some(Value::String(type_name)) => type_name.clone(),
            _ => {
                return Err(FactoryError::InvalidConfig(format!(
                    "Config for adapter {} needs a type name",
                    key
                )));
            }
        };

        let options = match entry.get("options") {
            None | Some(Value::Null) => Options::new(),
            Some(Value::Object(options)) => options.clone(),
            Some(_) => {
                return Err(FactoryError::InvalidConfig(format!(
                    "Options for adapter {} must be a map",
                    key
                )));
            }
        };

        Ok(Self { type_name, options })
    }
}

/// Resolve the configuration of adapter `key`.
pub fn adapter_config(locator: &dyn ServiceLocator, key: &str) -> FactoryResult<AdapterConfig> {
    AdapterConfig::from_tree(&cache_tree(locator)?, key)
}

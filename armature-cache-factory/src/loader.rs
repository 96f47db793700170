// Configuration file loaders

use crate::error::{FactoryError, FactoryResult};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Environment variable holding the path of the configuration file.
pub const CONFIG_PATH_ENV: &str = "ARMATURE_CACHE_CONFIG";

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// Loads the application configuration that holds the `cache` tree.
///
/// # Examples
///
/// ```
/// use armature_cache_factory::{ConfigLoader, FileFormat, ServiceContainer};
///
/// let config = ConfigLoader::new(FileFormat::Toml)
///     .parse("[cache.default]\ntype = \"array\"")
///     .unwrap();
///
/// let container = ServiceContainer::new();
/// container.set_config(config);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: impl AsRef<Path>) -> FactoryResult<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| FactoryError::Load("No file extension found".to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| FactoryError::Load(format!("Unsupported format: {}", ext)))?;

        Ok(Self::new(format))
    }

    /// Load the file named by `ARMATURE_CACHE_CONFIG`, reading `.env` first.
    pub fn from_env() -> FactoryResult<Value> {
        dotenvy::dotenv().ok();

        let path = std::env::var(CONFIG_PATH_ENV)
            .map_err(|e| FactoryError::Load(format!("{}: {}", CONFIG_PATH_ENV, e)))?;

        Self::auto(&path)?.load_file(&path)
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>) -> FactoryResult<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| FactoryError::Load(format!("Failed to read file: {}", e)))?;

        debug!(path = %path.display(), format = ?self.format, "Loading cache configuration");
        self.parse(&content)
    }

    /// Parse configuration from string
    pub fn parse(&self, content: &str) -> FactoryResult<Value> {
        match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| FactoryError::Parse(format!("JSON parse error: {}", e))),
            FileFormat::Toml => {
                let value: toml::Value = toml::from_str(content)
                    .map_err(|e| FactoryError::Parse(format!("TOML parse error: {}", e)))?;

                serde_json::to_value(value)
                    .map_err(|e| FactoryError::Parse(format!("TOML to JSON conversion error: {}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let result = loader
            .parse(r#"{"cache": {"default": {"type": "array", "options": {"maxItems": 10}}}}"#)
            .unwrap();

        assert_eq!(result["cache"]["default"]["options"]["maxItems"], 10);
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            [cache.redis]
            type = "redis"

            [cache.redis.options]
            dsn = "redis://localhost"
            timeout = 5
        "#;

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["cache"]["redis"]["type"], "redis");
        assert_eq!(result["cache"]["redis"]["options"]["timeout"], 5);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ConfigLoader::new(FileFormat::Json).parse("{"),
            Err(FactoryError::Parse(_))
        ));
        assert!(matches!(
            ConfigLoader::new(FileFormat::Toml).parse("= nope"),
            Err(FactoryError::Parse(_))
        ));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("yaml"), None);
        assert!(matches!(ConfigLoader::auto("cache"), Err(FactoryError::Load(_))));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"cache": {{"default": {{"type": "apcu"}}}}}}"#).unwrap();

        let config = ConfigLoader::auto(file.path())
            .unwrap()
            .load_file(file.path())
            .unwrap();
        assert_eq!(config["cache"]["default"]["type"], "apcu");
    }
}

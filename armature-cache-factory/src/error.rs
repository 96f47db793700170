// Error types for cache factories

use armature_cache::CacheError;
use thiserror::Error;

/// Result type for factory operations.
pub type FactoryResult<T> = Result<T, FactoryError>;

/// Errors raised while resolving configuration and building adapters.
///
/// None of them is transient; a failed build fails the same way when retried
/// with the same configuration.
#[derive(Error, Debug)]
pub enum FactoryError {
    /// A required piece of configuration is absent
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Configuration is present but unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Call-by-name invoked without a service locator
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// A native connection handle could not be created
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

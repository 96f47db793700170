//! Store configuration shared by every adapter.

use crate::error::{CacheError, CacheResult};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Characters that may not appear in a cache key.
pub const RESERVED_CHARACTERS: &str = "{}()/\\@";

/// Separator between a namespace and a key.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Reject empty keys and keys containing [`RESERVED_CHARACTERS`].
pub fn validate_key(key: &str) -> CacheResult<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("cache key must not be empty".to_string()));
    }

    if let Some(c) = key.chars().find(|c| RESERVED_CHARACTERS.contains(*c)) {
        return Err(CacheError::InvalidKey(format!(
            "cache key \"{}\" contains reserved character '{}'",
            key, c
        )));
    }

    Ok(())
}

/// Reject namespaces containing [`RESERVED_CHARACTERS`] or the
/// [`NAMESPACE_SEPARATOR`].
///
/// Keys may contain `:`, so a namespace `a:b` would share keys with the
/// namespace `a`. An empty namespace is valid.
///
/// Unnamespaced stores are not isolated: on a shared backend the unnamespaced
/// key `a:x` is the key `x` of namespace `a`.
pub fn validate_namespace(namespace: &str) -> CacheResult<()> {
    let reserved = namespace
        .chars()
        .find(|c| *c == NAMESPACE_SEPARATOR || RESERVED_CHARACTERS.contains(*c));

    match reserved {
        Some(c) => Err(CacheError::Config(format!(
            "namespace \"{}\" contains reserved character '{}'",
            namespace, c
        ))),
        None => Ok(()),
    }
}

/// Namespace and lifetime settings of a store.
///
/// Lifetimes are whole seconds; `0` disables the setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Prefix isolating this store's keys
    pub namespace: String,

    /// Lifetime applied when a write carries no TTL
    pub default_lifetime: u64,

    /// Upper bound for any TTL
    pub max_lifetime: u64,
}

impl StoreConfig {
    /// Create a configuration without namespace or lifetimes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the default lifetime in seconds.
    pub fn with_default_lifetime(mut self, seconds: u64) -> Self {
        self.default_lifetime = seconds;
        self
    }

    /// Set the maximum lifetime in seconds.
    pub fn with_max_lifetime(mut self, seconds: u64) -> Self {
        self.max_lifetime = seconds;
        self
    }

    /// Validate `key` and prefix it with the namespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_cache::StoreConfig;
    ///
    /// let config = StoreConfig::new().with_namespace("app");
    /// assert_eq!(config.build_key("user").unwrap(), "app:user");
    /// assert!(config.build_key("a/b").is_err());
    /// ```
    pub fn build_key(&self, key: &str) -> CacheResult<String> {
        validate_key(key)?;

        Ok(match self.namespace_prefix() {
            Some(prefix) => format!("{}{}", prefix, key),
            None => key.to_string(),
        })
    }

    /// Prefix shared by every key of this namespace, `None` when unnamespaced.
    pub fn namespace_prefix(&self) -> Option<String> {
        if self.namespace.is_empty() {
            None
        } else {
            Some(format!("{}{}", self.namespace, NAMESPACE_SEPARATOR))
        }
    }

    /// Full-key prefix selecting the keys of this namespace that start with
    /// `prefix`, `None` when it selects every key of the backend.
    pub fn scoped_prefix(&self, prefix: &str) -> Option<String> {
        let scoped = format!("{}{}", self.namespace_prefix().unwrap_or_default(), prefix);
        (!scoped.is_empty()).then_some(scoped)
    }

    /// Resolve the TTL of a write from the caller's TTL and the configured lifetimes.
    ///
    /// `None` means the item never expires.
    pub fn effective_ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        let ttl = ttl.filter(|d| !d.is_zero()).or_else(|| {
            (self.default_lifetime > 0).then(|| Duration::from_secs(self.default_lifetime))
        });

        if self.max_lifetime == 0 {
            return ttl;
        }

        let max = Duration::from_secs(self.max_lifetime);
        Some(ttl.map_or(max, |ttl| ttl.min(max)))
    }
}

/// Seconds since the Unix epoch.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Absolute expiry timestamp (Unix seconds) for a TTL.
///
/// A TTL reaching past `u64::MAX` never expires.
pub(crate) fn expiry_timestamp(ttl: Option<Duration>) -> Option<u64> {
    ttl.and_then(|ttl| unix_now().checked_add(ttl.as_secs().max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_key_with_namespace() {
        let config = StoreConfig::new().with_namespace("myapp");
        assert_eq!(config.build_key("user:123").unwrap(), "myapp:user:123");
    }

    #[test]
    fn test_build_key_without_namespace() {
        let config = StoreConfig::new();
        assert_eq!(config.build_key("user_123").unwrap(), "user_123");
    }

    #[test]
    fn test_reserved_characters_rejected() {
        for key in ["", "a{b", "a}b", "a(b", "a)b", "a/b", "a\\b", "a@b"] {
            assert!(
                matches!(validate_key(key), Err(CacheError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
        assert!(validate_key("user:profile.42-x_y").is_ok());
    }

    #[test]
    fn test_namespace_validation() {
        for namespace in ["", "app", "app.v2", "my-app_1+x"] {
            assert!(validate_namespace(namespace).is_ok(), "{:?}", namespace);
        }
        for namespace in ["a:b", "a/b", "a\\b", "a@b", "{a}"] {
            assert!(
                matches!(validate_namespace(namespace), Err(CacheError::Config(_))),
                "namespace {:?} should be rejected",
                namespace
            );
        }
    }

    #[test]
    fn test_scoped_prefix() {
        let config = StoreConfig::new().with_namespace("app");
        assert_eq!(config.scoped_prefix(""), Some("app:".to_string()));
        assert_eq!(config.scoped_prefix("users:"), Some("app:users:".to_string()));

        let config = StoreConfig::new();
        assert_eq!(config.scoped_prefix(""), None);
        assert_eq!(config.scoped_prefix("users:"), Some("users:".to_string()));
    }

    #[test]
    fn test_expiry_timestamp_saturates_to_never() {
        assert_eq!(expiry_timestamp(None), None);
        assert_eq!(expiry_timestamp(Some(Duration::MAX)), None);
        assert_eq!(expiry_timestamp(Some(Duration::from_secs(u64::MAX))), None);
        assert!(expiry_timestamp(Some(Duration::from_secs(60))).is_some());
    }

    #[test]
    fn test_effective_ttl_defaults() {
        let config = StoreConfig::new();
        assert_eq!(config.effective_ttl(None), None);
        assert_eq!(config.effective_ttl(Some(Duration::ZERO)), None);

        let config = StoreConfig::new().with_default_lifetime(60);
        assert_eq!(config.effective_ttl(None), Some(Duration::from_secs(60)));
        assert_eq!(
            config.effective_ttl(Some(Duration::from_secs(5))),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_effective_ttl_is_capped() {
        let config = StoreConfig::new().with_max_lifetime(30);
        assert_eq!(config.effective_ttl(None), Some(Duration::from_secs(30)));
        assert_eq!(
            config.effective_ttl(Some(Duration::from_secs(300))),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            config.effective_ttl(Some(Duration::from_secs(10))),
            Some(Duration::from_secs(10))
        );
    }
}

//! Filesystem store: one JSON envelope file per item.

use crate::config::{StoreConfig, expiry_timestamp, unix_now, validate_key};
use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// Subdirectory of the system temp dir used when no directory is configured.
pub const DEFAULT_DIRECTORY_NAME: &str = "armature-cache";

const UNNAMESPACED_DIR: &str = "@";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk representation of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Envelope {
    pub key: String,
    pub expires_at: Option<u64>,
    pub value: String,
}

impl Envelope {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Store writing each item to its own file under `<directory>/<namespace>`.
#[derive(Debug, Clone)]
pub struct FilesystemCache {
    directory: PathBuf,
    root: PathBuf,
    config: StoreConfig,
}

impl FilesystemCache {
    /// Create a store.
    ///
    /// An empty `directory` selects `<temp dir>/armature-cache`. The namespace
    /// names a subdirectory, so it is limited to `[-+_.A-Za-z0-9]` and may not
    /// be `.` or `..`.
    pub fn new(
        namespace: impl Into<String>,
        default_lifetime: u64,
        directory: impl AsRef<Path>,
    ) -> CacheResult<Self> {
        let config = StoreConfig::new()
            .with_namespace(namespace)
            .with_default_lifetime(default_lifetime);
        validate_directory_name(&config.namespace)?;

        let directory = directory.as_ref();
        let directory = if directory.as_os_str().is_empty() {
            std::env::temp_dir().join(DEFAULT_DIRECTORY_NAME)
        } else {
            directory.to_path_buf()
        };

        let root = if config.namespace.is_empty() {
            directory.join(UNNAMESPACED_DIR)
        } else {
            directory.join(&config.namespace)
        };

        Ok(Self {
            directory,
            root,
            config,
        })
    }

    /// Base directory holding every namespace.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn default_lifetime(&self) -> u64 {
        self.config.default_lifetime
    }

    /// Path of the file storing `key`.
    pub fn item_path(&self, key: &str) -> CacheResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(encode_file_name(key)))
    }

    pub(crate) async fn read_envelope(&self, key: &str) -> CacheResult<Option<Envelope>> {
        let path = self.item_path(key)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope = serde_json::from_slice(&bytes)
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;

        if envelope.is_expired(unix_now()) {
            trace!(path = %path.display(), "Removing expired cache file");
            remove_if_exists(&path).await?;
            return Ok(None);
        }

        Ok(Some(envelope))
    }

    pub(crate) async fn write_envelope(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> CacheResult<Envelope> {
        let path = self.item_path(key)?;
        let envelope = Envelope {
            key: key.to_string(),
            expires_at: expiry_timestamp(self.config.effective_ttl(ttl)),
            value,
        };

        tokio::fs::create_dir_all(&self.root).await?;

        let tmp = self.root.join(format!(
            ".{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, serde_json::to_vec(&envelope)?).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        Ok(envelope)
    }

    pub(crate) async fn remove_item(&self, key: &str) -> CacheResult<()> {
        let path = self.item_path(key)?;
        remove_if_exists(&path).await
    }

    /// Remove the files of every key starting with `prefix`.
    pub(crate) async fn remove_prefixed(&self, prefix: &str) -> CacheResult<()> {
        if prefix.is_empty() {
            return match tokio::fs::remove_dir_all(&self.root).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        // Hex encoding keeps key prefixes as file name prefixes
        let encoded = encode_file_name(prefix);
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(&encoded) {
                remove_if_exists(&entry.path()).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FilesystemCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.read_envelope(key).await?.map(|envelope| envelope.value))
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        self.write_envelope(key, value, ttl).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.remove_item(key).await
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        self.remove_prefixed(prefix).await
    }
}

/// Reject namespaces that are not a plain directory name.
fn validate_directory_name(namespace: &str) -> CacheResult<()> {
    let invalid = matches!(namespace, "." | "..")
        || namespace
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_' | '.')));

    if invalid {
        return Err(CacheError::Config(format!(
            "namespace \"{}\" contains characters outside [-+_.A-Za-z0-9]",
            namespace
        )));
    }
    Ok(())
}

/// Hex-encode a key so any valid key maps to a portable file name.
fn encode_file_name(key: &str) -> String {
    key.bytes().map(|b| format!("{:02x}", b)).collect()
}

async fn remove_if_exists(path: &Path) -> CacheResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

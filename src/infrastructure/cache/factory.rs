//! Store factory for runtime backend selection

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::config::CacheSettings;
use crate::domain::cache::CacheStore;
use crate::domain::DomainError;

use super::filesystem::{FilesystemStore, FilesystemStoreConfig};
use super::redis::{RedisStore, RedisStoreConfig};

/// Supported store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    /// One file per entry in a local directory
    #[default]
    Filesystem,
    /// Redis key-value server
    Redis,
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreType::Filesystem => write!(f, "filesystem"),
            StoreType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for StoreType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "filesystem" | "file" | "fs" => Ok(StoreType::Filesystem),
            "redis" => Ok(StoreType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown store type: {}. Valid types: filesystem, redis",
                s
            ))),
        }
    }
}

/// Configuration for the store factory
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend to create
    pub store_type: StoreType,
    /// Entry lifetime shared by every entry; zero disables expiry
    pub ttl: Duration,
    /// Cache directory (filesystem only)
    pub directory: PathBuf,
    /// Entry file extension (filesystem only)
    pub extension: String,
    /// Redis URL (required for Redis type)
    pub redis_url: Option<String>,
    /// Key namespace (Redis only)
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let filesystem = FilesystemStoreConfig::default();

        Self {
            store_type: StoreType::Filesystem,
            ttl: filesystem.ttl,
            directory: filesystem.directory,
            extension: filesystem.extension,
            redis_url: None,
            key_prefix: RedisStoreConfig::default().key_prefix,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for a filesystem store
    pub fn filesystem(directory: impl Into<PathBuf>) -> Self {
        Self {
            store_type: StoreType::Filesystem,
            directory: directory.into(),
            ..Default::default()
        }
    }

    /// Creates a configuration for a Redis store
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            store_type: StoreType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Sets the entry lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the entry file extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}

impl From<&CacheSettings> for StoreConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            store_type: settings.store,
            ttl: Duration::from_secs(settings.expires_secs),
            directory: settings.directory.clone(),
            extension: settings.extension.clone(),
            redis_url: Some(settings.redis_url.clone()),
            key_prefix: settings.key_prefix.clone(),
        }
    }
}

/// Factory for creating store instances
#[derive(Debug, Default)]
pub struct StoreFactory;

impl StoreFactory {
    /// Creates a new store factory
    pub fn new() -> Self {
        Self
    }

    /// Creates a store based on configuration
    pub async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn CacheStore>, DomainError> {
        match config.store_type {
            StoreType::Filesystem => {
                let filesystem_config = FilesystemStoreConfig::new(config.directory.clone())
                    .with_ttl(config.ttl)
                    .with_extension(config.extension.clone());

                let store = FilesystemStore::open(filesystem_config).await?;
                Ok(Arc::new(store))
            }
            StoreType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for Redis store type")
                })?;

                let redis_config = RedisStoreConfig::new(url)
                    .with_ttl(config.ttl)
                    .with_key_prefix(config.key_prefix.clone());

                let store = RedisStore::new(redis_config).await?;
                Ok(Arc::new(store))
            }
        }
    }
}

//! Filesystem cache store
//!
//! One file per entry, `<key>.<extension>`, directly inside the cache
//! directory. The file's modification time is the capture time.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::domain::cache::{CacheKey, CacheStore};
use crate::domain::minify::Minifier;
use crate::domain::DomainError;

/// Configuration for the filesystem store
#[derive(Debug, Clone)]
pub struct FilesystemStoreConfig {
    /// Directory owned by this store
    pub directory: PathBuf,
    /// Entry lifetime; zero disables expiry
    pub ttl: Duration,
    /// File extension of entries
    pub extension: String,
}

impl Default for FilesystemStoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("cache/cachetop"),
            ttl: Duration::from_secs(3600),
            extension: "html".to_string(),
        }
    }
}

impl FilesystemStoreConfig {
    /// Creates a configuration for the given directory
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
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
}

/// Page cache stored as plain files
#[derive(Debug)]
pub struct FilesystemStore {
    config: FilesystemStoreConfig,
    minifier: Minifier,
}

impl FilesystemStore {
    /// Creates a store; the directory is created on first write
    pub fn new(config: FilesystemStoreConfig) -> Self {
        Self {
            config,
            minifier: Minifier::new(),
        }
    }

    /// Creates a store and makes sure its directory exists
    pub async fn open(config: FilesystemStoreConfig) -> Result<Self, DomainError> {
        fs::create_dir_all(&config.directory).await.map_err(|e| {
            DomainError::cache(format!(
                "Failed to create cache directory '{}': {}",
                config.directory.display(),
                e
            ))
        })?;

        Ok(Self::new(config))
    }

    pub fn config(&self) -> &FilesystemStoreConfig {
        &self.config
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &CacheKey) -> Result<PathBuf, DomainError> {
        let name = key.as_str();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !valid {
            return Err(DomainError::validation(format!(
                "Invalid cache key '{}'",
                name
            )));
        }

        Ok(self
            .config
            .directory
            .join(format!("{}.{}", name, self.config.extension)))
    }

    fn is_expired(&self, modified: SystemTime) -> bool {
        if self.config.ttl.is_zero() {
            return false;
        }

        SystemTime::now()
            .duration_since(modified)
            .map(|age| age > self.config.ttl)
            .unwrap_or(false)
    }

    /// Entries are `<digest>.<extension>`; anything else in the directory is left alone
    fn owns(&self, path: &Path) -> bool {
        let has_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.config.extension);

        has_extension
            && path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| CacheKey::from_hex(stem).is_digest())
    }

    /// Entry files directly inside the cache directory
    async fn entries(&self) -> Result<Vec<PathBuf>, DomainError> {
        let mut dir = match fs::read_dir(&self.config.directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("list", &self.config.directory, e)),
        };

        let mut entries = Vec::new();

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| io_error("list", &self.config.directory, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|file_type| file_type.is_file())
                .unwrap_or(false);
            let path = entry.path();

            if is_file && self.owns(&path) {
                entries.push(path);
            }
        }

        Ok(entries)
    }

    async fn remove(&self, path: &Path) -> Result<bool, DomainError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("delete", path, e)),
        }
    }
}

fn io_error(operation: &str, path: &Path, error: std::io::Error) -> DomainError {
    DomainError::cache(format!(
        "Failed to {} '{}': {}",
        operation,
        path.display(),
        error
    ))
}

#[async_trait]
impl CacheStore for FilesystemStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, DomainError> {
        let path = self.path_for(key)?;

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("stat", &path, e)),
        };

        let modified = metadata
            .modified()
            .map_err(|e| io_error("stat", &path, e))?;

        if self.is_expired(modified) {
            debug!(key = %key, "Cache entry expired");
            self.remove(&path).await?;
            return Ok(None);
        }

        let body = match fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => String::new(),
            Err(e) => return Err(io_error("read", &path, e)),
        };

        // Empty or unreadable entries are corrupt
        if body.is_empty() {
            debug!(key = %key, "Removing corrupt cache entry");
            self.remove(&path).await?;
            return Ok(None);
        }

        Ok(Some(body))
    }

    async fn set(&self, key: &CacheKey, body: &str) -> Result<(), DomainError> {
        let path = self.path_for(key)?;

        fs::create_dir_all(&self.config.directory)
            .await
            .map_err(|e| io_error("create", &self.config.directory, e))?;

        // Write beside the entry and rename over it so readers never see a
        // partial file; the temporary extension keeps it out of listings.
        let tmp = self
            .config
            .directory
            .join(format!(".{}.{}.tmp", key, uuid::Uuid::new_v4().simple()));
        let minified = self.minifier.compress(body);

        fs::write(&tmp, minified.as_bytes())
            .await
            .map_err(|e| io_error("write", &tmp, e))?;

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_error("write", &path, e));
        }

        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, DomainError> {
        let path = self.path_for(key)?;
        self.remove(&path).await
    }

    async fn exists(&self, key: &CacheKey) -> Result<bool, DomainError> {
        let path = self.path_for(key)?;

        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("stat", &path, e)),
        }
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.entries().await?.len())
    }

    async fn flush(&self) -> Result<(), DomainError> {
        for path in self.entries().await? {
            self.remove(&path).await?;
        }

        Ok(())
    }

    fn backend(&self) -> &'static str {
        "filesystem"
    }
}

//! Redis cache store

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::warn;

use crate::domain::cache::{CacheKey, CacheStore};
use crate::domain::minify::Minifier;
use crate::domain::DomainError;

/// Configuration for the Redis store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Namespace prepended to every key as `<prefix>:<key>`
    pub key_prefix: String,
    /// Entry lifetime; zero stores entries without expiry
    pub ttl: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "cachetop".to_string(),
            ttl: Duration::from_secs(3600),
        }
    }
}

impl RedisStoreConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the entry lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

/// Page cache stored in Redis
///
/// Bodies are minified, then base64 encoded. Expiry is left to Redis; the
/// value and its TTL are written by a single `SET ... EX` command.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
    minifier: Minifier,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    /// Connects to Redis
    pub async fn new(config: RedisStoreConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            config,
            minifier: Minifier::new(),
        })
    }

    /// All namespaced keys, walked with SCAN
    async fn scan_keys(&self) -> Result<Vec<String>, DomainError> {
        let pattern = self.config.namespaced("*");
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut conn)
                .await
                .map_err(|e| DomainError::cache(format!("Failed to scan keys: {}", e)))?;

            found.extend(keys);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

fn encode_body(body: &str) -> String {
    STANDARD.encode(body.as_bytes())
}

fn decode_body(stored: &str) -> Option<String> {
    let bytes = STANDARD.decode(stored).ok()?;
    String::from_utf8(bytes).ok().filter(|body| !body.is_empty())
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, DomainError> {
        let namespaced = self.config.namespaced(key.as_str());
        let mut conn = self.connection.clone();

        let stored: Option<String> = conn.get(&namespaced).await.map_err(|e| {
            DomainError::cache(format!("Failed to get key '{}': {}", key, e))
        })?;

        let Some(stored) = stored else {
            return Ok(None);
        };

        match decode_body(&stored) {
            Some(body) => Ok(Some(body)),
            None => {
                warn!(key = %key, "Removing corrupt cache entry");
                self.delete(key).await?;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &CacheKey, body: &str) -> Result<(), DomainError> {
        let namespaced = self.config.namespaced(key.as_str());
        let mut conn = self.connection.clone();
        let value = encode_body(&self.minifier.compress(body));

        let result: redis::RedisResult<()> = if self.config.ttl.is_zero() {
            conn.set(&namespaced, value).await
        } else {
            conn.set_ex(&namespaced, value, self.config.ttl.as_secs().max(1))
                .await
        };

        result.map_err(|e| DomainError::cache(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, DomainError> {
        let namespaced = self.config.namespaced(key.as_str());
        let mut conn = self.connection.clone();

        let deleted: i32 = conn.del(&namespaced).await.map_err(|e| {
            DomainError::cache(format!("Failed to delete key '{}': {}", key, e))
        })?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &CacheKey) -> Result<bool, DomainError> {
        let namespaced = self.config.namespaced(key.as_str());
        let mut conn = self.connection.clone();

        let exists: bool = conn.exists(&namespaced).await.map_err(|e| {
            DomainError::cache(format!("Failed to check existence of key '{}': {}", key, e))
        })?;

        Ok(exists)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.scan_keys().await?.len())
    }

    async fn flush(&self) -> Result<(), DomainError> {
        let keys = self.scan_keys().await?;
        let mut conn = self.connection.clone();

        for chunk in keys.chunks(500) {
            let _: i32 = conn
                .del(chunk.to_vec())
                .await
                .map_err(|e| DomainError::cache(format!("Failed to delete keys: {}", e)))?;
        }

        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

//! In-memory content metadata repository

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{CacheStamp, ContentMetadataRepository, DomainError};

/// In-memory implementation of ContentMetadataRepository
#[derive(Debug)]
pub struct InMemoryContentMetadataRepository {
    stamps: RwLock<HashMap<String, CacheStamp>>,
}

impl InMemoryContentMetadataRepository {
    /// Creates a new empty repository
    pub fn new() -> Self {
        Self {
            stamps: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryContentMetadataRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentMetadataRepository for InMemoryContentMetadataRepository {
    async fn record(&self, content_id: &str, stamp: CacheStamp) -> Result<(), DomainError> {
        let mut stamps = self
            .stamps
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        stamps.insert(content_id.to_string(), stamp);
        Ok(())
    }

    async fn find(&self, content_id: &str) -> Result<Option<CacheStamp>, DomainError> {
        let stamps = self
            .stamps
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(stamps.get(content_id).cloned())
    }

    async fn remove(&self, content_id: &str) -> Result<Option<CacheStamp>, DomainError> {
        let mut stamps = self
            .stamps
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(stamps.remove(content_id))
    }

    async fn clear(&self) -> Result<usize, DomainError> {
        let mut stamps = self
            .stamps
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let removed = stamps.len();
        stamps.clear();
        Ok(removed)
    }
}

//! Content metadata repository trait
//!
//! The host application owns content items (posts, pages, products). When a
//! page is captured, the controller records which cache key it was stored
//! under and when, so the entry can later be deleted by content id and its
//! freshness validators can be computed on hits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::cache::CacheKey;
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Cache key and capture time recorded against a content item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStamp {
    pub key: CacheKey,
    pub stored_at: DateTime<Utc>,
}

impl CacheStamp {
    pub fn new(key: CacheKey, stored_at: DateTime<Utc>) -> Self {
        Self { key, stored_at }
    }

    /// Stamp for an entry captured right now
    pub fn now(key: CacheKey) -> Self {
        Self::new(key, Utc::now())
    }
}

/// Repository for per-content cache metadata
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentMetadataRepository: Send + Sync {
    /// Records (or replaces) the stamp for a content item
    async fn record(&self, content_id: &str, stamp: CacheStamp) -> Result<(), DomainError>;

    /// Finds the stamp recorded for a content item
    async fn find(&self, content_id: &str) -> Result<Option<CacheStamp>, DomainError>;

    /// Removes and returns the stamp recorded for a content item
    async fn remove(&self, content_id: &str) -> Result<Option<CacheStamp>, DomainError>;

    /// Removes every stamp, returning how many were removed
    async fn clear(&self) -> Result<usize, DomainError>;
}

//! Content domain - Links rendered content items to their cache entries

mod repository;

pub use repository::{CacheStamp, ContentMetadataRepository};

#[cfg(test)]
pub use repository::MockContentMetadataRepository;

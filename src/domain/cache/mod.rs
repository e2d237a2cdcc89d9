//! Cache domain - Page cache keys and the store abstraction

mod key;
mod repository;

pub use key::{canonical_url, split_url, CacheKey, CacheKeyGenerator};
pub use repository::CacheStore;

#[cfg(test)]
pub use repository::mock::MockCacheStore;

//! API layer - HTTP page cache

pub mod cache;

pub use cache::{page_cache_middleware, CacheController, PageContext, PageKind};

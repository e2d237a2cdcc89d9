//! Domain layer - Cache keys, stores, minification and fragments

pub mod cache;
pub mod content;
pub mod error;
pub mod fragment;
pub mod minify;

pub use cache::{CacheKey, CacheKeyGenerator, CacheStore};
pub use content::{CacheStamp, ContentMetadataRepository};
pub use error::DomainError;
pub use fragment::{
    DirectiveKind, FragmentDirective, FragmentPayload, FragmentProtocol, FragmentRegistry,
    Rehydrated,
};
pub use minify::Minifier;

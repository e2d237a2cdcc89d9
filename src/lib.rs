//! cachetop
//!
//! A full-page HTML cache for axum applications:
//! - Filesystem and Redis stores with TTL expiry
//! - Conservative whitespace minification of stored pages
//! - Dynamic fragments replayed on every cache hit
//! - HTTP validators and conditional requests

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::cache::CacheController;
use config::CacheSettings;
use domain::{FragmentProtocol, FragmentRegistry};
use infrastructure::cache::{StoreConfig, StoreFactory};
use infrastructure::content::InMemoryContentMetadataRepository;
use tracing::info;

/// Create a controller backed by the configured store and in-memory
/// content metadata
pub async fn create_controller(
    settings: &CacheSettings,
    registry: FragmentRegistry,
) -> anyhow::Result<CacheController> {
    let store = StoreFactory::new()
        .create(&StoreConfig::from(settings))
        .await?;

    info!(backend = store.backend(), "Page cache store ready");

    Ok(CacheController::new(
        store,
        Arc::new(InMemoryContentMetadataRepository::new()),
        FragmentProtocol::new(Arc::new(registry)),
        settings,
    ))
}

//! Infrastructure layer - Store backends, metadata, logging and metrics

pub mod cache;
pub mod content;
pub mod logging;
pub mod metrics;

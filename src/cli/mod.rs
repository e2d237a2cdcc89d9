//! CLI module for cachetop
//!
//! Administrative subcommands operating on the configured store:
//! - `flush`: delete one page or everything
//! - `count`: number of stored pages
//! - `exists`: whether a URL is cached

pub mod count;
pub mod exists;
pub mod flush;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::{AppConfig, CacheSettings};
use crate::domain::CacheStore;
use crate::infrastructure::cache::{StoreConfig, StoreFactory};
use crate::infrastructure::logging;

/// cachetop - full-page HTML cache administration
#[derive(Parser)]
#[command(name = "cachetop")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Delete cached pages
    Flush(flush::FlushArgs),

    /// Print the number of cached pages
    Count,

    /// Check whether a URL is cached
    Exists(exists::ExistsArgs),
}

/// Loads `.env` and configuration, then installs logging
pub fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    Ok(config)
}

/// Opens the store described by the settings
pub async fn open_store(settings: &CacheSettings) -> anyhow::Result<Arc<dyn CacheStore>> {
    let store = StoreFactory::new()
        .create(&StoreConfig::from(settings))
        .await?;

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        let cli = Cli::try_parse_from(["cachetop", "count"]).unwrap();
        assert!(matches!(cli.command, Command::Count));
    }

    #[test]
    fn test_parse_exists() {
        let cli = Cli::try_parse_from(["cachetop", "exists", "--url", "http://example.com/a"])
            .unwrap();

        match cli.command {
            Command::Exists(args) => assert_eq!(args.url, "http://example.com/a"),
            _ => panic!("expected exists"),
        }
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(Cli::try_parse_from(["cachetop", "serve"]).is_err());
    }
}

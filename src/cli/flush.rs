//! Flush command - deletes one page or the whole store

use anyhow::bail;
use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::{CacheKey, CacheKeyGenerator};

/// Arguments for the flush command
#[derive(Args, Clone, Debug)]
#[group(required = true, multiple = false)]
pub struct FlushArgs {
    /// Flush every cached page
    #[arg(long)]
    pub all: bool,

    /// Flush the page stored under this key
    #[arg(long)]
    pub key: Option<String>,

    /// Flush the page cached for this URL
    #[arg(long)]
    pub url: Option<String>,
}

/// Run the flush command
pub async fn run(args: FlushArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let message = execute(&config, &args).await?;

    println!("{}", message);
    Ok(())
}

/// Performs the flush; fails when nothing was deleted
pub async fn execute(config: &AppConfig, args: &FlushArgs) -> anyhow::Result<String> {
    let store = super::open_store(&config.cache).await?;

    if args.all {
        let count = store.count().await?;
        if count == 0 {
            bail!("Page cache is already empty");
        }

        store.flush().await?;
        info!(count, backend = store.backend(), "Flushed page cache");

        return Ok(format!("Flushed {} cached page(s)", count));
    }

    let key = match (&args.key, &args.url) {
        (Some(key), _) => CacheKey::from_hex(key.trim()),
        (None, Some(url)) => CacheKeyGenerator::new()
            .with_query_string(config.cache.include_query_string)
            .generate_for_url(url),
        (None, None) => bail!("Nothing to flush: pass --all, --key or --url"),
    };

    if !store.delete(&key).await? {
        bail!("No cached page for key {}", key);
    }

    info!(key = %key, backend = store.backend(), "Flushed cached page");
    Ok(format!("Flushed {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.cache.directory = dir.path().to_path_buf();
        config
    }

    fn args(all: bool, key: Option<&str>, url: Option<&str>) -> FlushArgs {
        FlushArgs {
            all,
            key: key.map(String::from),
            url: url.map(String::from),
        }
    }

    #[test]
    fn test_flush_requires_exactly_one_target() {
        assert!(Cli::try_parse_from(["cachetop", "flush"]).is_err());
        assert!(Cli::try_parse_from(["cachetop", "flush", "--all", "--key", "abc"]).is_err());

        let cli = Cli::try_parse_from(["cachetop", "flush", "--url", "http://example.com/"]).unwrap();
        match cli.command {
            Command::Flush(args) => assert_eq!(args.url.as_deref(), Some("http://example.com/")),
            _ => panic!("expected flush"),
        }
    }

    #[tokio::test]
    async fn test_flush_url() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let store = super::super::open_store(&config.cache).await.unwrap();
        let key = CacheKeyGenerator::new().generate_for_url("http://example.com/a");
        store.set(&key, "<p>a</p>").await.unwrap();

        let message = execute(&config, &args(false, None, Some("http://example.com/a")))
            .await
            .unwrap();

        assert_eq!(message, format!("Flushed {}", key));
        assert!(!store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_flush_missing_key_fails() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let key = CacheKey::from_canonical("example.com/none");

        let result = execute(&config, &args(false, Some(key.as_str()), None)).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_flush_all() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let store = super::super::open_store(&config.cache).await.unwrap();
        store
            .set(&CacheKey::from_canonical("example.com/a"), "<p>a</p>")
            .await
            .unwrap();
        store
            .set(&CacheKey::from_canonical("example.com/b"), "<p>b</p>")
            .await
            .unwrap();

        let message = execute(&config, &args(true, None, None)).await.unwrap();

        assert_eq!(message, "Flushed 2 cached page(s)");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_flush_all_on_empty_store_fails() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let result = execute(&config, &args(true, None, None)).await;

        assert!(result.is_err());
    }
}

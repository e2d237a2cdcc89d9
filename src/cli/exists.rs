//! Exists command - checks whether a URL is cached

use clap::Args;

use crate::config::AppConfig;
use crate::domain::CacheKeyGenerator;

/// Arguments for the exists command
#[derive(Args, Clone, Debug)]
pub struct ExistsArgs {
    /// URL to look up, e.g. https://example.com/about
    #[arg(long)]
    pub url: String,
}

/// Run the exists command
pub async fn run(args: ExistsArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let cached = execute(&config, &args).await?;

    println!("{}", if cached { "cached" } else { "not cached" });
    Ok(())
}

pub async fn execute(config: &AppConfig, args: &ExistsArgs) -> anyhow::Result<bool> {
    let store = super::open_store(&config.cache).await?;
    let key = CacheKeyGenerator::new()
        .with_query_string(config.cache.include_query_string)
        .generate_for_url(&args.url);

    Ok(store.exists(&key).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_exists() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.cache.directory = dir.path().to_path_buf();
        let args = ExistsArgs {
            url: "https://example.com/about".to_string(),
        };

        assert!(!execute(&config, &args).await.unwrap());

        let store = crate::cli::open_store(&config.cache).await.unwrap();
        let key = CacheKeyGenerator::new().generate_for_url("http://example.com/about");
        store.set(&key, "<p>about</p>").await.unwrap();

        assert!(execute(&config, &args).await.unwrap());
    }
}

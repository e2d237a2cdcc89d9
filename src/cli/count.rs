//! Count command - prints the number of cached pages

use crate::config::AppConfig;

/// Run the count command
pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    println!("{}", execute(&config).await?);
    Ok(())
}

pub async fn execute(config: &AppConfig) -> anyhow::Result<usize> {
    let store = super::open_store(&config.cache).await?;
    Ok(store.count().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CacheKey;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_count() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.cache.directory = dir.path().to_path_buf();

        assert_eq!(execute(&config).await.unwrap(), 0);

        let store = super::super::open_store(&config.cache).await.unwrap();
        store
            .set(&CacheKey::from_canonical("example.com/a"), "<p>a</p>")
            .await
            .unwrap();

        assert_eq!(execute(&config).await.unwrap(), 1);
    }
}

use std::path::PathBuf;

use serde::Deserialize;

use crate::infrastructure::cache::StoreType;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Page cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Store backend
    pub store: StoreType,
    /// Entry lifetime in seconds; 0 disables expiry
    pub expires_secs: u64,
    /// Filesystem cache directory
    pub directory: PathBuf,
    /// Filesystem entry extension
    pub extension: String,
    pub redis_url: String,
    /// Redis key namespace
    pub key_prefix: String,
    /// Hash the query string into the key
    pub include_query_string: bool,
    /// When set, URLs carrying non-whitelisted query parameters bypass the cache
    pub pretty_permalinks: bool,
    pub query_whitelist: Vec<String>,
    /// Cookie name prefixes that mark a caller as authenticated
    pub auth_cookie_prefixes: Vec<String>,
    /// Path prefixes that are never cached
    pub excluded_paths: Vec<String>,
    /// `max-age` sent with cached pages
    pub browser_max_age_secs: u64,
    /// Larger bodies are served but not stored
    pub max_body_bytes: usize,
    /// Management actions require an authenticated caller
    pub restrict_actions: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            store: StoreType::Filesystem,
            expires_secs: 3600,
            directory: PathBuf::from("cache/cachetop"),
            extension: "html".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "cachetop".to_string(),
            include_query_string: false,
            pretty_permalinks: true,
            query_whitelist: [
                "utm_source",
                "utm_medium",
                "utm_campaign",
                "utm_term",
                "utm_content",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            auth_cookie_prefixes: ["wordpress_logged_in_", "wp-postpass_", "comment_author_"]
                .into_iter()
                .map(String::from)
                .collect(),
            excluded_paths: Vec::new(),
            browser_max_age_secs: 3600,
            max_body_bytes: 5 * 1024 * 1024,
            restrict_actions: true,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("CACHETOP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cache.query_whitelist")
                    .with_list_parse_key("cache.auth_cookie_prefixes")
                    .with_list_parse_key("cache.excluded_paths")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn parse(toml: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.cache.store, StoreType::Filesystem);
        assert_eq!(config.cache.expires_secs, 3600);
        assert_eq!(config.cache.query_whitelist.len(), 5);
        assert!(config.cache.pretty_permalinks);
        assert!(!config.cache.include_query_string);
        assert!(config.cache.restrict_actions);
    }

    #[test]
    fn test_partial_cache_section_keeps_defaults() {
        let config = parse(
            r#"
            [cache]
            store = "redis"
            expires_secs = 0
            excluded_paths = ["/cart", "/checkout"]
            "#,
        );

        assert_eq!(config.cache.store, StoreType::Redis);
        assert_eq!(config.cache.expires_secs, 0);
        assert_eq!(config.cache.excluded_paths, vec!["/cart", "/checkout"]);
        assert_eq!(config.cache.key_prefix, "cachetop");
        assert_eq!(config.cache.extension, "html");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_logging_section() {
        let config = parse(
            r#"
            [logging]
            level = "debug"
            format = "json"
            "#,
        );

        assert_eq!(config.logging.level, "debug");
        assert!(matches!(config.logging.format, LogFormat::Json));
    }
}

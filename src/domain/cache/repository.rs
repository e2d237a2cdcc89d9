//! Cache store trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

use super::CacheKey;

/// Page cache store
///
/// Both backends share the same semantics: `set` minifies the body before
/// writing and arms the store-wide TTL, `get` evicts expired entries lazily
/// and reports them as absent.
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Returns the cached body if present and not expired
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, DomainError>;

    /// Stores the minified body, overwriting any existing entry
    async fn set(&self, key: &CacheKey, body: &str) -> Result<(), DomainError>;

    /// Removes the entry, returning whether something was removed
    async fn delete(&self, key: &CacheKey) -> Result<bool, DomainError>;

    /// Checks existence without reading the body or touching the TTL
    async fn exists(&self, key: &CacheKey) -> Result<bool, DomainError>;

    /// Returns the number of entries owned by this store
    async fn count(&self) -> Result<usize, DomainError>;

    /// Removes every entry owned by this store
    async fn flush(&self) -> Result<(), DomainError>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock store for testing; stores bodies verbatim
    #[derive(Debug, Default)]
    pub struct MockCacheStore {
        entries: Mutex<HashMap<String, String>>,
        error: Mutex<Option<String>>,
    }

    impl MockCacheStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_entry(self, key: &CacheKey, body: &str) -> Self {
            self.entries
                .lock()
                .unwrap()
                .insert(key.as_str().to_string(), body.to_string());
            self
        }

        pub fn with_error(self, error: impl Into<String>) -> Self {
            *self.error.lock().unwrap() = Some(error.into());
            self
        }

        pub fn body(&self, key: &CacheKey) -> Option<String> {
            self.entries.lock().unwrap().get(key.as_str()).cloned()
        }

        fn check_error(&self) -> Result<(), DomainError> {
            if let Some(error) = self.error.lock().unwrap().clone() {
                return Err(DomainError::cache(error));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CacheStore for MockCacheStore {
        async fn get(&self, key: &CacheKey) -> Result<Option<String>, DomainError> {
            self.check_error()?;
            Ok(self.body(key))
        }

        async fn set(&self, key: &CacheKey, body: &str) -> Result<(), DomainError> {
            self.check_error()?;
            self.entries
                .lock()
                .unwrap()
                .insert(key.as_str().to_string(), body.to_string());
            Ok(())
        }

        async fn delete(&self, key: &CacheKey) -> Result<bool, DomainError> {
            self.check_error()?;
            Ok(self.entries.lock().unwrap().remove(key.as_str()).is_some())
        }

        async fn exists(&self, key: &CacheKey) -> Result<bool, DomainError> {
            self.check_error()?;
            Ok(self.entries.lock().unwrap().contains_key(key.as_str()))
        }

        async fn count(&self) -> Result<usize, DomainError> {
            self.check_error()?;
            Ok(self.entries.lock().unwrap().len())
        }

        async fn flush(&self) -> Result<(), DomainError> {
            self.check_error()?;
            self.entries.lock().unwrap().clear();
            Ok(())
        }

        fn backend(&self) -> &'static str {
            "mock"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_store_set_get() {
            let store = MockCacheStore::new();
            let key = CacheKey::from_canonical("example.com/a");

            store.set(&key, "<p>Hello</p>").await.unwrap();

            let body = store.get(&key).await.unwrap();
            assert_eq!(body.as_deref(), Some("<p>Hello</p>"));
        }

        #[tokio::test]
        async fn test_mock_store_delete_is_idempotent() {
            let store = MockCacheStore::new();
            let key = CacheKey::from_canonical("example.com/a");
            store.set(&key, "x").await.unwrap();

            assert!(store.delete(&key).await.unwrap());
            assert!(!store.delete(&key).await.unwrap());
            assert!(!store.exists(&key).await.unwrap());
        }

        #[tokio::test]
        async fn test_mock_store_with_error() {
            let store = MockCacheStore::new().with_error("down");
            let key = CacheKey::from_canonical("example.com/a");

            assert!(store.get(&key).await.is_err());
        }
    }
}

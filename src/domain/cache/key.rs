//! Cache key generation from request URLs

use std::fmt;

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest identifying one cached page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hashes an already canonical URL
    pub fn from_canonical(canonical: &str) -> Self {
        Self(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    /// Wraps an existing digest, e.g. one recorded in content metadata
    pub fn from_hex(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the string representation of the key
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the key looks like a SHA-256 hex digest
    pub fn is_digest(&self) -> bool {
        self.0.len() == 64 && self.0.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds the canonical, scheme-less form of a URL: `host` + `path`,
/// followed by `?query` when requested and present.
///
/// Case and path normalization are left to the caller.
pub fn canonical_url(host: &str, path: &str, query: Option<&str>, include_query: bool) -> String {
    let mut canonical = String::with_capacity(host.len() + path.len());
    canonical.push_str(host);
    canonical.push_str(path);

    if include_query {
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            canonical.push('?');
            canonical.push_str(query);
        }
    }

    canonical
}

/// Splits a URL string (with or without scheme) into host, path and query.
/// A missing path is reported as `/`.
pub fn split_url(url: &str) -> (&str, &str, Option<&str>) {
    let without_scheme = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };

    let without_fragment = without_scheme
        .split_once('#')
        .map_or(without_scheme, |(before, _)| before);

    let (location, query) = match without_fragment.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (without_fragment, None),
    };

    match location.find('/') {
        Some(idx) => (&location[..idx], &location[idx..], query),
        None => (location, "/", query),
    }
}

/// Derives cache keys from URLs
#[derive(Debug, Clone, Default)]
pub struct CacheKeyGenerator {
    include_query: bool,
}

impl CacheKeyGenerator {
    /// Creates a generator that ignores query strings
    pub fn new() -> Self {
        Self::default()
    }

    /// Includes the query string in the canonical URL
    pub fn with_query_string(mut self, include: bool) -> Self {
        self.include_query = include;
        self
    }

    /// Returns true if query strings are part of the key
    pub fn includes_query(&self) -> bool {
        self.include_query
    }

    /// Generates a key from request parts
    pub fn generate(&self, host: &str, path: &str, query: Option<&str>) -> CacheKey {
        CacheKey::from_canonical(&self.canonical(host, path, query))
    }

    /// Returns the canonical URL the key is derived from
    pub fn canonical(&self, host: &str, path: &str, query: Option<&str>) -> String {
        canonical_url(host, path, query, self.include_query)
    }

    /// Generates a key from a full URL string
    pub fn generate_for_url(&self, url: &str) -> CacheKey {
        let (host, path, query) = split_url(url);
        self.generate(host, path, query)
    }
}

//! HTTP validators for cached pages

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::domain::CacheKey;

/// `Last-Modified` and `ETag` values for one stored entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    pub last_modified: String,
    pub etag: String,
    stored_at: i64,
}

impl Validators {
    pub fn new(stored_at: DateTime<Utc>, key: &CacheKey) -> Self {
        let digest = Sha256::digest(format!("{}{}", stored_at.timestamp(), key).as_bytes());

        Self {
            last_modified: stored_at.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            etag: format!("\"{}\"", hex::encode(digest)),
            stored_at: stored_at.timestamp(),
        }
    }

    /// Evaluates the request's conditional headers.
    ///
    /// `If-None-Match` wins when present; otherwise `If-Modified-Since` is
    /// compared at second precision.
    pub fn is_not_modified(&self, headers: &HeaderMap) -> bool {
        if let Some(value) = headers.get(header::IF_NONE_MATCH) {
            let Ok(value) = value.to_str() else {
                return false;
            };

            return value
                .split(',')
                .map(str::trim)
                .any(|tag| tag == "*" || tag.trim_start_matches("W/") == self.etag);
        }

        headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| DateTime::parse_from_rfc2822(value.trim()).ok())
            .is_some_and(|since| self.stored_at <= since.timestamp())
    }
}

/// Comment appended to every page served from the cache
pub fn trailer(key: &CacheKey, served_at: DateTime<Utc>) -> String {
    format!(
        " <!-- cached by cachetop - {} - hash: {} -->",
        served_at.format("%d.%m.%Y %H:%M:%S"),
        key
    )
}

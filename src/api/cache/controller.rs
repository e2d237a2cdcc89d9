//! Page cache controller
//!
//! Every request ends in one of four states:
//!
//! 1. ACTION: a management action in the query string is performed and
//!    answered directly.
//! 2. BYPASS: the request is rendered without touching the cache.
//! 3. HIT: the stored body is rehydrated and served with validators.
//! 4. MISS: the rendered response is captured, stored and served.
//!
//! Store and metadata failures never reach the client; they are logged and
//! the request proceeds as if uncached.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, request::Parts, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use futures::{stream, StreamExt};
use tracing::{debug, info, warn};

use crate::config::CacheSettings;
use crate::domain::{
    CacheKey, CacheKeyGenerator, CacheStamp, CacheStore, ContentMetadataRepository,
    FragmentProtocol,
};
use crate::infrastructure::metrics::{self, CacheOutcome};

use super::action::{strip_action, ActionResponse, CacheAction};
use super::bypass::{BypassHooks, BypassPolicy, DefaultBypassHooks};
use super::context::{request_host, ContentId, DoNotCache, PageContext};
use super::freshness::{trailer, Validators};

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Full-page cache in front of a render function
pub struct CacheController {
    store: Arc<dyn CacheStore>,
    metadata: Arc<dyn ContentMetadataRepository>,
    protocol: FragmentProtocol,
    hooks: Arc<dyn BypassHooks>,
    policy: BypassPolicy,
    keys: CacheKeyGenerator,
    max_age: Duration,
    max_body_bytes: usize,
    restrict_actions: bool,
}

impl fmt::Debug for CacheController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheController")
            .field("store", &self.store.backend())
            .field("protocol", &self.protocol)
            .field("policy", &self.policy)
            .field("keys", &self.keys)
            .field("max_age", &self.max_age)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("restrict_actions", &self.restrict_actions)
            .finish()
    }
}

impl CacheController {
    pub fn new(
        store: Arc<dyn CacheStore>,
        metadata: Arc<dyn ContentMetadataRepository>,
        protocol: FragmentProtocol,
        settings: &CacheSettings,
    ) -> Self {
        Self {
            store,
            metadata,
            protocol,
            hooks: Arc::new(DefaultBypassHooks),
            policy: BypassPolicy::from(settings),
            keys: CacheKeyGenerator::new().with_query_string(settings.include_query_string),
            max_age: Duration::from_secs(settings.browser_max_age_secs),
            max_body_bytes: settings.max_body_bytes,
            restrict_actions: settings.restrict_actions,
        }
    }

    /// Installs host bypass overrides
    pub fn with_hooks(mut self, hooks: Arc<dyn BypassHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Protocol used to emit fragments while rendering
    pub fn protocol(&self) -> &FragmentProtocol {
        &self.protocol
    }

    /// Key for a full URL, e.g. `https://example.com/a`
    pub fn key_for_url(&self, url: &str) -> CacheKey {
        self.keys.generate_for_url(url)
    }

    /// Answers a request from the cache, or renders it with `render` and
    /// stores the result.
    pub async fn handle<F, Fut>(&self, request: Request<Body>, render: F) -> Response
    where
        F: FnOnce(Request<Body>) -> Fut,
        Fut: Future<Output = Response>,
    {
        let (parts, body) = request.into_parts();
        let context = parts
            .extensions
            .get::<PageContext>()
            .cloned()
            .unwrap_or_default();

        if let Some(action) = CacheAction::from_query(parts.uri.query()) {
            return self.perform_action(action, &parts, &context).await;
        }

        if let Some(reason) = self.policy.evaluate(&parts, &context, self.hooks.as_ref()) {
            debug!(path = %parts.uri.path(), reason = %reason, "Bypassing page cache");
            metrics::record_request(CacheOutcome::Bypass);

            let response = render(Request::from_parts(parts, body)).await;
            return with_no_cache(response);
        }

        let key = self.key_for_request(&parts, parts.uri.query());

        match self.lookup(&key).await {
            Some(cached) => self.serve_hit(&parts, &context, &key, cached).await,
            None => {
                debug!(path = %parts.uri.path(), key = %key, "Page cache miss");

                let response = render(Request::from_parts(parts, body)).await;
                self.capture(key, context, response).await
            }
        }
    }

    /// Deletes one entry by key
    pub async fn flush_key(&self, key: &CacheKey) -> bool {
        match self.store.delete(key).await {
            Ok(deleted) => deleted,
            Err(e) => {
                store_error("delete", &e);
                false
            }
        }
    }

    /// Deletes the entry for a URL
    pub async fn flush_url(&self, url: &str) -> bool {
        let key = self.key_for_url(url);
        self.flush_key(&key).await
    }

    /// Deletes the entry recorded for a content item, and its metadata
    pub async fn flush_content(&self, content_id: &str) -> bool {
        match self.metadata.remove(content_id).await {
            Ok(Some(stamp)) => self.flush_key(&stamp.key).await,
            Ok(None) => false,
            Err(e) => {
                store_error("metadata_remove", &e);
                false
            }
        }
    }

    /// Flushes the store and forgets all content metadata
    pub async fn flush_all(&self) -> bool {
        let flushed = match self.store.flush().await {
            Ok(()) => true,
            Err(e) => {
                store_error("flush", &e);
                false
            }
        };

        if let Err(e) = self.metadata.clear().await {
            store_error("metadata_clear", &e);
        }

        flushed
    }

    /// Number of stored pages; 0 if the store is unavailable
    pub async fn count(&self) -> usize {
        self.store.count().await.unwrap_or_else(|e| {
            store_error("count", &e);
            0
        })
    }

    /// Whether a page is stored for `url`
    pub async fn is_cached(&self, url: &str) -> bool {
        let key = self.key_for_url(url);

        self.store.exists(&key).await.unwrap_or_else(|e| {
            store_error("exists", &e);
            false
        })
    }

    fn key_for_request(&self, parts: &Parts, query: Option<&str>) -> CacheKey {
        self.keys
            .generate(request_host(parts), parts.uri.path(), query)
    }

    async fn lookup(&self, key: &CacheKey) -> Option<String> {
        match self.store.get(key).await {
            Ok(cached) => cached,
            Err(e) => {
                store_error("get", &e);
                None
            }
        }
    }

    async fn perform_action(
        &self,
        action: CacheAction,
        parts: &Parts,
        context: &PageContext,
    ) -> Response {
        metrics::record_request(CacheOutcome::Action);

        if self.restrict_actions && !self.hooks.may_manage(parts, context) {
            warn!(action = %action, path = %parts.uri.path(), "Rejected unauthenticated cache action");

            return with_no_cache(
                (StatusCode::FORBIDDEN, Json(ActionResponse::new(action, false))).into_response(),
            );
        }

        let flushed = match action {
            CacheAction::Clear | CacheAction::Flush => {
                let query = strip_action(parts.uri.query());
                let key = self.key_for_request(parts, query.as_deref());
                let deleted = self.flush_key(&key).await;

                if let Some(content_id) = &context.content_id {
                    if let Err(e) = self.metadata.remove(content_id).await {
                        store_error("metadata_remove", &e);
                    }
                }

                deleted
            }
            CacheAction::FlushAll => self.flush_all().await,
        };

        info!(action = %action, path = %parts.uri.path(), flushed, "Handled cache action");

        with_no_cache(Json(ActionResponse::new(action, flushed)).into_response())
    }

    async fn serve_hit(
        &self,
        parts: &Parts,
        context: &PageContext,
        key: &CacheKey,
        cached: String,
    ) -> Response {
        let rehydrated = self.protocol.rehydrate(&cached);

        // Fresh dynamic output invalidates the stored validators
        let validators = if rehydrated.changed() {
            None
        } else {
            self.stamp_for(context, key)
                .await
                .map(|stamp| Validators::new(stamp.stored_at, key))
        };

        let mut response = match &validators {
            Some(validators) if validators.is_not_modified(&parts.headers) => {
                debug!(key = %key, "Page not modified");
                metrics::record_request(CacheOutcome::NotModified);

                StatusCode::NOT_MODIFIED.into_response()
            }
            _ => {
                debug!(key = %key, replaced = rehydrated.replaced, "Page cache hit");
                metrics::record_request(CacheOutcome::Hit);

                let body = format!("{}{}", rehydrated.body, trailer(key, Utc::now()));
                let mut response = Response::new(Body::from(body));
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(HTML_CONTENT_TYPE),
                );
                response
            }
        };

        let headers = response.headers_mut();

        if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", self.max_age.as_secs())) {
            headers.insert(header::CACHE_CONTROL, value);
        }

        if let Some(validators) = validators {
            if let Ok(value) = HeaderValue::from_str(&validators.last_modified) {
                headers.insert(header::LAST_MODIFIED, value);
            }
            if let Ok(value) = HeaderValue::from_str(&validators.etag) {
                headers.insert(header::ETAG, value);
            }
        }

        response
    }

    /// Capture time of `key`, if it was recorded for this page's content item
    async fn stamp_for(&self, context: &PageContext, key: &CacheKey) -> Option<CacheStamp> {
        let content_id = context.content_id.as_deref()?;

        match self.metadata.find(content_id).await {
            Ok(stamp) => stamp.filter(|stamp| &stamp.key == key),
            Err(e) => {
                store_error("metadata_find", &e);
                None
            }
        }
    }

    async fn capture(&self, key: CacheKey, context: PageContext, response: Response) -> Response {
        if response.extensions().get::<DoNotCache>().is_some() {
            debug!(key = %key, "Handler marked response as not cacheable");
            metrics::record_request(CacheOutcome::Bypass);
            return with_no_cache(response);
        }

        metrics::record_request(CacheOutcome::Miss);

        if !self.is_capturable(&response) {
            return response;
        }

        let content_id = response
            .extensions()
            .get::<ContentId>()
            .map(|id| id.0.clone())
            .or(context.content_id);

        let (parts, body) = response.into_parts();

        match read_limited(body, self.max_body_bytes).await {
            Captured::Complete(bytes) => {
                self.store_body(&key, content_id.as_deref(), &bytes).await;
                Response::from_parts(parts, Body::from(bytes))
            }
            Captured::Passthrough(body) => {
                debug!(key = %key, "Response body exceeds capture limit, not caching");
                Response::from_parts(parts, body)
            }
        }
    }

    fn is_capturable(&self, response: &Response) -> bool {
        if response.status() != StatusCode::OK {
            return false;
        }

        let headers = response.headers();

        let is_html = headers
            .get(header::CONTENT_TYPE)
            .map(|value| {
                value
                    .to_str()
                    .map(|value| value.trim().to_ascii_lowercase().starts_with("text/html"))
                    .unwrap_or(false)
            })
            .unwrap_or(true);

        let within_limit = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok())
            .is_none_or(|length| length <= self.max_body_bytes);

        is_html && within_limit
    }

    async fn store_body(&self, key: &CacheKey, content_id: Option<&str>, bytes: &Bytes) {
        if bytes.is_empty() || bytes.len() > self.max_body_bytes {
            return;
        }

        let Ok(body) = std::str::from_utf8(bytes) else {
            debug!(key = %key, "Response body is not UTF-8, not caching");
            return;
        };

        if let Err(e) = self.store.set(key, body).await {
            store_error("set", &e);
            return;
        }

        if let Some(content_id) = content_id {
            if let Err(e) = self.metadata.record(content_id, CacheStamp::now(key.clone())).await {
                store_error("metadata_record", &e);
            }
        }

        debug!(key = %key, bytes = bytes.len(), "Stored page");
    }
}

/// Outcome of buffering a response body for the store
enum Captured {
    /// The whole body, no larger than the limit
    Complete(Bytes),
    /// The body could not be captured; the read prefix is replayed ahead of
    /// the unread remainder
    Passthrough(Body),
}

/// Buffers at most `limit` bytes of `body`
///
/// Streams that grow past the limit or fail mid-way are handed back intact
/// instead of being collected.
async fn read_limited(body: Body, limit: usize) -> Captured {
    let mut chunks = body.into_data_stream();
    let mut buffered = Vec::new();

    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(chunk) => {
                buffered.extend_from_slice(&chunk);

                if buffered.len() > limit {
                    let head = stream::iter([Ok::<_, axum::Error>(Bytes::from(buffered))]);
                    return Captured::Passthrough(Body::from_stream(head.chain(chunks)));
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read response body");
                let replay = stream::iter([Ok(Bytes::from(buffered)), Err(e)]);
                return Captured::Passthrough(Body::from_stream(replay));
            }
        }
    }

    Captured::Complete(Bytes::from(buffered))
}

fn with_no_cache(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

fn store_error(operation: &'static str, error: &crate::domain::DomainError) {
    warn!(operation, error = %error, "Page cache store failure");
    metrics::record_store_error(operation);
}

//! Page facts supplied by the host application
//!
//! A [`PageContext`] travels as a request extension. Handlers may attach
//! [`DoNotCache`] or [`ContentId`] to the response extensions once they know
//! more about what they rendered.

use axum::http::{header, request::Parts};

/// What kind of page a request renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageKind {
    #[default]
    Regular,
    Search,
    NotFound,
    Feed,
    Trackback,
    Robots,
    Preview,
    /// Cart, checkout and account pages
    Transactional,
}

impl PageKind {
    /// Only regular pages are ever cached
    pub fn is_cacheable(&self) -> bool {
        matches!(self, PageKind::Regular)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Regular => "regular",
            PageKind::Search => "search",
            PageKind::NotFound => "not_found",
            PageKind::Feed => "feed",
            PageKind::Trackback => "trackback",
            PageKind::Robots => "robots",
            PageKind::Preview => "preview",
            PageKind::Transactional => "transactional",
        }
    }
}

/// Request extension describing the page about to be rendered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub kind: PageKind,
    pub password_required: bool,
    pub authenticated: bool,
    pub do_not_cache: bool,
    /// Content item the page renders, used to record and flush its entry
    pub content_id: Option<String>,
}

impl PageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: PageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    pub fn with_authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    pub fn with_password_required(mut self, password_required: bool) -> Self {
        self.password_required = password_required;
        self
    }

    pub fn with_do_not_cache(mut self, do_not_cache: bool) -> Self {
        self.do_not_cache = do_not_cache;
        self
    }
}

/// Response extension: serve the response but never store it
#[derive(Debug, Clone, Copy, Default)]
pub struct DoNotCache;

/// Response extension: the content item a handler rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentId(pub String);

/// Host the request was addressed to, as sent (including any port)
pub fn request_host(parts: &Parts) -> &str {
    parts
        .headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| parts.uri.host())
        .unwrap_or_default()
}

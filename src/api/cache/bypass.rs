//! Deciding whether a request skips the cache

use std::fmt;
use std::fmt::Debug;

use axum::http::{header, request::Parts, Method};

use crate::config::CacheSettings;

use super::context::{request_host, PageContext};

/// Host overrides consulted by the bypass policy
pub trait BypassHooks: Send + Sync + Debug {
    /// Forces a bypass for this request
    fn bypass(&self, _request: &Parts) -> bool {
        false
    }

    /// Excludes a canonical `host/path` URL from caching
    fn exclude_url(&self, _url: &str) -> bool {
        false
    }

    /// Whether authenticated callers skip the cache
    fn bypass_authenticated(&self, _request: &Parts) -> bool {
        true
    }

    /// Whether the caller may run management actions
    ///
    /// Cookies are not consulted; only the host's verified
    /// `PageContext::authenticated` counts.
    fn may_manage(&self, _request: &Parts, context: &PageContext) -> bool {
        context.authenticated
    }
}

/// Hooks that never override anything
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBypassHooks;

impl BypassHooks for DefaultBypassHooks {}

/// Why a request skipped the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    Hook,
    ExcludedUrl,
    PageKind,
    PasswordRequired,
    Authenticated,
    DoNotCache,
    Method,
    QueryString,
}

impl BypassReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BypassReason::Hook => "hook",
            BypassReason::ExcludedUrl => "excluded_url",
            BypassReason::PageKind => "page_kind",
            BypassReason::PasswordRequired => "password_required",
            BypassReason::Authenticated => "authenticated",
            BypassReason::DoNotCache => "do_not_cache",
            BypassReason::Method => "method",
            BypassReason::QueryString => "query_string",
        }
    }
}

impl fmt::Display for BypassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured bypass rules
#[derive(Debug, Clone)]
pub struct BypassPolicy {
    excluded_paths: Vec<String>,
    pretty_permalinks: bool,
    query_whitelist: Vec<String>,
    auth_cookie_prefixes: Vec<String>,
}

impl From<&CacheSettings> for BypassPolicy {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            excluded_paths: settings
                .excluded_paths
                .iter()
                .filter(|path| !path.is_empty())
                .cloned()
                .collect(),
            pretty_permalinks: settings.pretty_permalinks,
            query_whitelist: settings.query_whitelist.clone(),
            auth_cookie_prefixes: settings.auth_cookie_prefixes.clone(),
        }
    }
}

impl Default for BypassPolicy {
    fn default() -> Self {
        Self::from(&CacheSettings::default())
    }
}

impl BypassPolicy {
    /// Returns the first rule that sends this request around the cache
    pub fn evaluate(
        &self,
        request: &Parts,
        context: &PageContext,
        hooks: &dyn BypassHooks,
    ) -> Option<BypassReason> {
        if hooks.bypass(request) {
            return Some(BypassReason::Hook);
        }

        let path = request.uri.path();
        let url = format!("{}{}", request_host(request), path);

        if self.excluded_paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
            || hooks.exclude_url(&url)
        {
            return Some(BypassReason::ExcludedUrl);
        }

        if !context.kind.is_cacheable() {
            return Some(BypassReason::PageKind);
        }

        if context.password_required {
            return Some(BypassReason::PasswordRequired);
        }

        if self.is_authenticated(request, context) && hooks.bypass_authenticated(request) {
            return Some(BypassReason::Authenticated);
        }

        if context.do_not_cache {
            return Some(BypassReason::DoNotCache);
        }

        if request.method != Method::GET {
            return Some(BypassReason::Method);
        }

        if self.pretty_permalinks && self.has_foreign_query(request.uri.query()) {
            return Some(BypassReason::QueryString);
        }

        None
    }

    /// True if the host says so or a session cookie is present
    ///
    /// Cookies are client-controlled, so this only decides cache bypass.
    pub fn is_authenticated(&self, request: &Parts, context: &PageContext) -> bool {
        if context.authenticated {
            return true;
        }

        request
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.split('=').next())
            .map(str::trim)
            .any(|name| {
                self.auth_cookie_prefixes
                    .iter()
                    .any(|prefix| !prefix.is_empty() && name.starts_with(prefix.as_str()))
            })
    }

    /// True if the query carries a parameter outside the whitelist
    fn has_foreign_query(&self, query: Option<&str>) -> bool {
        query
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| pair.split('=').next())
            .any(|name| !self.query_whitelist.iter().any(|allowed| allowed == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::cache::context::PageKind;
    use axum::body::Body;
    use axum::http::Request;

    fn get(uri: &str) -> Parts {
        Request::builder()
            .uri(uri)
            .header("host", "example.com")
            .body(Body::empty())
            .unwrap()
            .into_parts()
            .0
    }

    fn evaluate(request: &Parts, context: &PageContext) -> Option<BypassReason> {
        BypassPolicy::default().evaluate(request, context, &DefaultBypassHooks)
    }

    #[derive(Debug)]
    struct AdminHooks;

    impl BypassHooks for AdminHooks {
        fn bypass(&self, request: &Parts) -> bool {
            request.headers.contains_key("x-preview")
        }

        fn exclude_url(&self, url: &str) -> bool {
            url == "example.com/private"
        }

        fn bypass_authenticated(&self, _request: &Parts) -> bool {
            false
        }

        fn may_manage(&self, request: &Parts, _context: &PageContext) -> bool {
            request.headers.contains_key("x-admin-token")
        }
    }

    #[test]
    fn test_plain_get_is_cached() {
        assert_eq!(evaluate(&get("/a"), &PageContext::new()), None);
    }

    #[test]
    fn test_non_get_bypasses() {
        let request = Request::builder()
            .method("POST")
            .uri("/a")
            .body(Body::empty())
            .unwrap()
            .into_parts()
            .0;

        assert_eq!(
            evaluate(&request, &PageContext::new()),
            Some(BypassReason::Method)
        );
    }

    #[test]
    fn test_special_pages_bypass() {
        for kind in [
            PageKind::Search,
            PageKind::NotFound,
            PageKind::Feed,
            PageKind::Trackback,
            PageKind::Robots,
            PageKind::Preview,
            PageKind::Transactional,
        ] {
            let context = PageContext::new().with_kind(kind);
            assert_eq!(evaluate(&get("/a"), &context), Some(BypassReason::PageKind));
        }
    }

    #[test]
    fn test_password_and_do_not_cache_bypass() {
        let context = PageContext::new().with_password_required(true);
        assert_eq!(
            evaluate(&get("/a"), &context),
            Some(BypassReason::PasswordRequired)
        );

        let context = PageContext::new().with_do_not_cache(true);
        assert_eq!(evaluate(&get("/a"), &context), Some(BypassReason::DoNotCache));
    }

    #[test]
    fn test_authenticated_cookie_bypasses() {
        let request = Request::builder()
            .uri("/a")
            .header("cookie", "theme=dark; wordpress_logged_in_abc=token")
            .body(Body::empty())
            .unwrap()
            .into_parts()
            .0;

        assert_eq!(
            evaluate(&request, &PageContext::new()),
            Some(BypassReason::Authenticated)
        );
    }

    #[test]
    fn test_unrelated_cookies_do_not_bypass() {
        let request = Request::builder()
            .uri("/a")
            .header("cookie", "theme=dark; session_wordpress_logged_in_=x")
            .body(Body::empty())
            .unwrap()
            .into_parts()
            .0;

        assert_eq!(evaluate(&request, &PageContext::new()), None);
    }

    #[test]
    fn test_query_whitelist() {
        assert_eq!(
            evaluate(&get("/a?utm_source=news&utm_medium=mail"), &PageContext::new()),
            None
        );
        assert_eq!(
            evaluate(&get("/a?utm_source=news&page=2"), &PageContext::new()),
            Some(BypassReason::QueryString)
        );
        assert_eq!(evaluate(&get("/a?"), &PageContext::new()), None);
    }

    #[test]
    fn test_query_allowed_without_pretty_permalinks() {
        let settings = CacheSettings {
            pretty_permalinks: false,
            ..Default::default()
        };
        let policy = BypassPolicy::from(&settings);

        assert_eq!(
            policy.evaluate(&get("/?p=12"), &PageContext::new(), &DefaultBypassHooks),
            None
        );
    }

    #[test]
    fn test_excluded_paths() {
        let settings = CacheSettings {
            excluded_paths: vec!["/cart".to_string(), String::new()],
            ..Default::default()
        };
        let policy = BypassPolicy::from(&settings);

        assert_eq!(
            policy.evaluate(&get("/cart/items"), &PageContext::new(), &DefaultBypassHooks),
            Some(BypassReason::ExcludedUrl)
        );
        assert_eq!(
            policy.evaluate(&get("/blog"), &PageContext::new(), &DefaultBypassHooks),
            None
        );
    }

    #[test]
    fn test_hooks() {
        let policy = BypassPolicy::default();

        let mut request = get("/a");
        request.headers.insert("x-preview", "1".parse().unwrap());
        assert_eq!(
            policy.evaluate(&request, &PageContext::new(), &AdminHooks),
            Some(BypassReason::Hook)
        );

        assert_eq!(
            policy.evaluate(&get("/private"), &PageContext::new(), &AdminHooks),
            Some(BypassReason::ExcludedUrl)
        );

        let context = PageContext::new().with_authenticated(true);
        assert_eq!(policy.evaluate(&get("/a"), &context, &AdminHooks), None);
    }

    #[test]
    fn test_session_cookie_does_not_grant_management() {
        let mut request = get("/a");
        request
            .headers
            .insert(header::COOKIE, "wordpress_logged_in_1=forged".parse().unwrap());

        assert!(BypassPolicy::default().is_authenticated(&request, &PageContext::new()));
        assert!(!DefaultBypassHooks.may_manage(&request, &PageContext::new()));
        assert!(DefaultBypassHooks.may_manage(&request, &PageContext::new().with_authenticated(true)));
    }

    #[test]
    fn test_hooks_can_grant_management() {
        let mut request = get("/a");
        assert!(!AdminHooks.may_manage(&request, &PageContext::new()));

        request.headers.insert("x-admin-token", "1".parse().unwrap());
        assert!(AdminHooks.may_manage(&request, &PageContext::new()));
    }
}

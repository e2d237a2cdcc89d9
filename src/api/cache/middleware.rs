//! axum middleware wiring the controller in front of a router

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::instrument;

use super::controller::CacheController;

/// Serves pages from the cache and captures the ones it does not have.
///
/// ```ignore
/// let app = Router::new()
///     .route("/", get(home))
///     .layer(middleware::from_fn_with_state(controller, page_cache_middleware));
/// ```
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_middleware(
    State(controller): State<Arc<CacheController>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    controller
        .handle(request, move |request| next.run(request))
        .await
}

//! Full-page cache for axum applications

mod action;
mod bypass;
mod context;
mod controller;
mod freshness;
mod middleware;

pub use action::{strip_action, ActionResponse, CacheAction, ACTION_PARAM};
pub use bypass::{BypassHooks, BypassPolicy, BypassReason, DefaultBypassHooks};
pub use context::{request_host, ContentId, DoNotCache, PageContext, PageKind};
pub use controller::CacheController;
pub use freshness::{trailer, Validators};
pub use middleware::page_cache_middleware;

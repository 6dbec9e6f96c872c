//! Render lifecycle hooks.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     preRenderEventHandler identifier
//!     → registry.rs (identifier → constructor)
//!     → Arc<dyn PrerenderEventHandler> (NoopHandler when unset or unknown)
//!
//! Per rendered request:
//!     before_render(request)               → Some(body) short-circuits the backend
//!     [backend call]
//!     after_render(request, meta, backend, html) → Some(body) replaces the HTML
//!
//! Shutdown:
//!     destroy() exactly once
//! ```
//!
//! # Design Decisions
//! - One handler instance serves every in-flight request, so implementations
//!   must be `Send + Sync` and synchronize their own state
//! - Hooks are synchronous; they run on the request task

pub mod cache;
pub mod registry;

use axum::http::{HeaderMap, StatusCode};
use std::time::Duration;

use crate::policy::RequestDescriptor;

pub use cache::InMemoryCacheHandler;
pub use registry::{HandlerRegistry, NOOP_HANDLER};

/// Status and headers of the response that will be sent to the caller.
/// Handlers may edit both in [`PrerenderEventHandler::after_render`].
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// What the render backend returned, as received.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Full backend URL that was requested.
    pub url: String,
    pub elapsed: Duration,
}

/// Extension point around each backend render.
pub trait PrerenderEventHandler: Send + Sync {
    /// Called before the backend request is built. A non-empty return value
    /// is sent to the caller as the response body and the backend is skipped.
    fn before_render(&self, _request: &RequestDescriptor) -> Option<String> {
        None
    }

    /// Called after a successful backend response, before anything is
    /// written to the caller. A non-empty return value replaces `html`.
    fn after_render(
        &self,
        _request: &RequestDescriptor,
        _response: &mut ResponseMeta,
        _backend: &BackendResponse,
        _html: &str,
    ) -> Option<String> {
        None
    }

    /// Called once when the pipeline shuts down.
    fn destroy(&self) {}
}

/// Handler that does nothing. Used when no handler is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl PrerenderEventHandler for NoopHandler {}

//! Prerender middleware for axum applications.
//!
//! Requests from search-engine crawlers and social-media scrapers are
//! answered with a page rendered by a Prerender service; everything else
//! reaches the wrapped application untouched.
//!
//! ```text
//!   Client ──▶ prerender_middleware ──▶ DecisionEngine ──▶ render? ──no──▶ application
//!                                                            │
//!                                                           yes
//!                                                            ▼
//!                                   before_render hook ──▶ render backend ──▶ after_render hook
//!                                                            │
//!                                                 failure / 5xx ──▶ application
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod policy;
pub mod render;

pub use config::{GatewayConfig, PrerenderConfig};
pub use error::PrerenderError;
pub use hooks::{HandlerRegistry, PrerenderEventHandler};
pub use http::{prerender_middleware, HttpServer};
pub use lifecycle::Shutdown;
pub use policy::{DecisionEngine, RequestDescriptor, Verdict};
pub use render::{Prerender, RenderOutcome};

//! HTTP middleware.

pub mod prerender;

pub use prerender::prerender_middleware;

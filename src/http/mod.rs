//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (add request ID)
//!     → middleware/prerender.rs (crawler? → render pipeline)
//!         rendered     → prerendered response to client
//!         pass-through → server.rs origin handler → origin application
//!     → headers.rs (hop-by-hop filtering in every direction)
//! ```

pub mod headers;
pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::prerender_middleware;
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;

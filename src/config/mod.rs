//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! [prerender] table (flat string map)
//!     → prerender.rs (merge list overrides with built-ins, once)
//!     → PrerenderConfig shared via Arc with the decision engine
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Prerender numeric settings are parsed lazily, when the client is built

pub mod loader;
pub mod prerender;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use prerender::PrerenderConfig;
pub use schema::{GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig, OriginConfig};

//! Prerender policy subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request head
//!     → request.rs (RequestDescriptor: URL, user agent, referer, headers)
//!     → decision.rs (ordered checks against PrerenderConfig)
//!     → rules.rs (whitelist / blacklist pattern matching)
//!     → Verdict { should_render, target_url }
//! ```
//!
//! # Design Decisions
//! - Patterns compiled once at startup, never per request
//! - Evaluation is pure and infallible: every request gets a verdict
//! - Exclusions (method, extension, blacklist) win over inclusions

pub mod decision;
pub mod request;
pub mod rules;

pub use decision::{DecisionEngine, Verdict};
pub use request::RequestDescriptor;
pub use rules::UrlRules;

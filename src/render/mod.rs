//! Render backend subsystem.
//!
//! # Data Flow
//! ```text
//! PrerenderConfig
//!     → client.rs (pooled, redirect-free reqwest client, built once)
//!     → pipeline.rs (Prerender: decide → hooks → backend → response)
//! ```
//!
//! # Design Decisions
//! - Config errors surface when the client is built and abort startup
//! - Backend errors never reach the caller; they degrade to pass-through
//! - Shutdown swaps the client out, so teardown runs exactly once

pub mod client;
pub mod pipeline;

pub use client::build_client;
pub use pipeline::{Prerender, RenderOutcome, PRERENDER_TOKEN_HEADER};

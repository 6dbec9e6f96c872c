//! Errors raised while wiring up the prerender pipeline.
//!
//! Only construction can fail. Once a [`Prerender`](crate::render::Prerender)
//! exists, per-request failures are logged and degrade to pass-through.

use std::num::ParseIntError;
use thiserror::Error;

/// Configuration-time failure of the prerender pipeline.
#[derive(Debug, Error)]
pub enum PrerenderError {
    /// A numeric setting could not be parsed.
    #[error("invalid value for `{key}`: {value:?} is not a valid integer")]
    InvalidNumber {
        key: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// `proxy` was configured without `proxyPort`.
    #[error("`proxyPort` is required when `proxy` is set")]
    MissingProxyPort,

    /// The upstream proxy host and port do not form a valid URL.
    #[error("invalid upstream proxy address `{0}`")]
    InvalidProxy(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build render client: {0}")]
    Client(#[from] reqwest::Error),
}

impl PrerenderError {
    pub(crate) fn invalid_number(key: &'static str, value: &str, source: ParseIntError) -> Self {
        Self::InvalidNumber {
            key,
            value: value.to_string(),
            source,
        }
    }
}

//! Render backend HTTP client construction.
//!
//! # Responsibilities
//! - Build one pooled client for the whole process
//! - Never follow redirects: backend 3xx responses go back to the caller as-is
//! - Route through the upstream proxy when `proxy`/`proxyPort` are set
//! - Bound backend waits with `socketTimeout` (milliseconds)
//!
//! Numeric settings are parsed here, not when the config is loaded, so a bad
//! value fails client construction and aborts startup.

use std::time::Duration;

use reqwest::{redirect, Client, Proxy};
use url::Url;

use crate::config::prerender::{keys, PrerenderConfig};
use crate::error::PrerenderError;

/// Idle connections kept per backend host when not configured.
pub const DEFAULT_MAX_IDLE_PER_HOST: usize = 20;

const USER_AGENT: &str = concat!("prerender-proxy/", env!("CARGO_PKG_VERSION"));

/// Build the pooled render client from the prerender config.
pub fn build_client(config: &PrerenderConfig) -> Result<Client, PrerenderError> {
    let pool_size = match config.max_connections_per_host() {
        Some(raw) => parse_number::<usize>(keys::MAX_CONNECTIONS_PER_HOST, raw)?,
        None => DEFAULT_MAX_IDLE_PER_HOST,
    };

    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .redirect(redirect::Policy::none())
        .pool_max_idle_per_host(pool_size);

    builder = match upstream_proxy(config)? {
        Some(proxy_url) => {
            tracing::info!(proxy = %proxy_url, "Routing render requests through upstream proxy");
            builder.proxy(Proxy::all(proxy_url)?)
        }
        None => builder.no_proxy(),
    };

    if let Some(raw) = config.socket_timeout() {
        let millis = parse_number::<u64>(keys::SOCKET_TIMEOUT, raw)?;
        builder = builder.timeout(Duration::from_millis(millis));
    }

    let client = builder.build()?;
    tracing::debug!(pool_max_idle_per_host = pool_size, "Render client built");
    Ok(client)
}

fn upstream_proxy(config: &PrerenderConfig) -> Result<Option<Url>, PrerenderError> {
    let Some(host) = config.proxy() else {
        return Ok(None);
    };
    let raw_port = config.proxy_port().ok_or(PrerenderError::MissingProxyPort)?;
    let port = parse_number::<u16>(keys::PROXY_PORT, raw_port)?;

    let address = format!("http://{}:{}", host.trim(), port);
    Url::parse(&address)
        .map(Some)
        .map_err(|_| PrerenderError::InvalidProxy(address))
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, PrerenderError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| PrerenderError::invalid_number(key, raw, e))
}

//! In-memory render cache built on the hook contract.
//!
//! `after_render` stores successful (200) renders keyed by the canonical
//! request URL; `before_render` serves them until they expire, skipping the
//! backend entirely.
//!
//! Selected with `preRenderEventHandler = "in-memory-cache"`. Settings, read
//! from the same prerender map:
//! - `cacheTtlSeconds`: entry lifetime, default 300
//! - `cacheMaxEntries`: cap on stored pages, default 1000

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use dashmap::DashMap;

use crate::config::prerender::keys;
use crate::config::PrerenderConfig;
use crate::hooks::{BackendResponse, PrerenderEventHandler, ResponseMeta};
use crate::policy::RequestDescriptor;

const DEFAULT_TTL: Duration = Duration::from_secs(300);
const DEFAULT_MAX_ENTRIES: usize = 1000;

struct CachedPage {
    html: String,
    stored_at: Instant,
}

/// Caches rendered pages in process memory.
pub struct InMemoryCacheHandler {
    entries: DashMap<String, CachedPage>,
    ttl: Duration,
    max_entries: usize,
}

impl InMemoryCacheHandler {
    /// Registry identifier.
    pub const NAME: &'static str = "in-memory-cache";

    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Reads `cacheTtlSeconds` and `cacheMaxEntries`, falling back to
    /// defaults (with a warning) when they are missing or malformed.
    pub fn from_config(config: &PrerenderConfig) -> Self {
        let ttl = parse_or(config, keys::CACHE_TTL_SECONDS, DEFAULT_TTL.as_secs());
        let max_entries = parse_or(config, keys::CACHE_MAX_ENTRIES, DEFAULT_MAX_ENTRIES as u64);
        Self::new(Duration::from_secs(ttl), max_entries as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, page| page.stored_at.elapsed() < ttl);
    }
}

impl PrerenderEventHandler for InMemoryCacheHandler {
    fn before_render(&self, request: &RequestDescriptor) -> Option<String> {
        let key = cache_key(request);
        let hit = self
            .entries
            .get(key)
            .filter(|page| page.stored_at.elapsed() < self.ttl)
            .map(|page| page.html.clone());

        match &hit {
            Some(_) => tracing::debug!(url = %key, "Render cache hit"),
            None => tracing::trace!(url = %key, "Render cache miss"),
        }
        hit
    }

    fn after_render(
        &self,
        request: &RequestDescriptor,
        response: &mut ResponseMeta,
        _backend: &BackendResponse,
        html: &str,
    ) -> Option<String> {
        if response.status != StatusCode::OK || html.is_empty() {
            return None;
        }

        if self.entries.len() >= self.max_entries {
            self.evict_expired();
        }
        if self.entries.len() < self.max_entries {
            self.entries.insert(
                cache_key(request).to_string(),
                CachedPage {
                    html: html.to_string(),
                    stored_at: Instant::now(),
                },
            );
        }
        None
    }

    fn destroy(&self) {
        tracing::debug!(entries = self.entries.len(), "Clearing render cache");
        self.entries.clear();
    }
}

fn cache_key(request: &RequestDescriptor) -> &str {
    request.forwarded_url.as_deref().unwrap_or(&request.url)
}

fn parse_or(config: &PrerenderConfig, key: &str, default: u64) -> u64 {
    match config.get(key).map(|v| v.trim().parse::<u64>()) {
        Some(Ok(v)) => v,
        Some(Err(e)) => {
            tracing::warn!(key = %key, error = %e, default, "Invalid cache setting, using default");
            default
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use std::collections::HashMap;

    fn descriptor(url: &str) -> RequestDescriptor {
        let req = axum::http::Request::builder().uri(url).body(()).unwrap();
        RequestDescriptor::from_request(&req, None)
    }

    fn meta(status: StatusCode) -> ResponseMeta {
        ResponseMeta {
            status,
            headers: HeaderMap::new(),
        }
    }

    fn backend() -> BackendResponse {
        BackendResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            url: "http://render/http://example.com/".to_string(),
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_stores_and_serves_ok_renders() {
        let cache = InMemoryCacheHandler::new(Duration::from_secs(60), 10);
        let req = descriptor("http://example.com/page");

        assert!(cache.before_render(&req).is_none());
        assert!(cache
            .after_render(&req, &mut meta(StatusCode::OK), &backend(), "<html>page</html>")
            .is_none());
        assert_eq!(cache.before_render(&req).as_deref(), Some("<html>page</html>"));
        assert!(cache.before_render(&descriptor("http://example.com/other")).is_none());
    }

    #[test]
    fn test_skips_non_ok_renders() {
        let cache = InMemoryCacheHandler::new(Duration::from_secs(60), 10);
        let req = descriptor("http://example.com/missing");
        cache.after_render(&req, &mut meta(StatusCode::NOT_FOUND), &backend(), "not found");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_are_not_served() {
        let cache = InMemoryCacheHandler::new(Duration::ZERO, 10);
        let req = descriptor("http://example.com/page");
        cache.after_render(&req, &mut meta(StatusCode::OK), &backend(), "<html/>");
        assert!(cache.before_render(&req).is_none());
    }

    #[test]
    fn test_respects_max_entries() {
        let cache = InMemoryCacheHandler::new(Duration::from_secs(60), 1);
        for path in ["/a", "/b"] {
            let req = descriptor(&format!("http://example.com{path}"));
            cache.after_render(&req, &mut meta(StatusCode::OK), &backend(), "<html/>");
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_destroy_clears() {
        let cache = InMemoryCacheHandler::new(Duration::from_secs(60), 10);
        let req = descriptor("http://example.com/page");
        cache.after_render(&req, &mut meta(StatusCode::OK), &backend(), "<html/>");
        cache.destroy();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_from_config() {
        let raw: HashMap<String, String> = [
            ("cacheTtlSeconds".to_string(), "30".to_string()),
            ("cacheMaxEntries".to_string(), "bogus".to_string()),
        ]
        .into_iter()
        .collect();
        let cache = InMemoryCacheHandler::from_config(&PrerenderConfig::new(raw));
        assert_eq!(cache.ttl, Duration::from_secs(30));
        assert_eq!(cache.max_entries, DEFAULT_MAX_ENTRIES);
    }
}

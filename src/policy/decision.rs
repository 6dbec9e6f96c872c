//! Prerender-or-pass-through decision.
//!
//! Checks run in a fixed order and the first conclusive one wins:
//!
//! ```text
//! method not GET/HEAD              → pass
//! path ends in ignored extension   → pass
//! blacklist hit (URL or Referer)   → pass
//! whitelist set and no hit         → pass
//! _escaped_fragment_ in query      → render
//! user agent matches a crawler     → render
//! X-Bufferbot header present       → render
//! otherwise                        → pass
//! ```
//!
//! Exclusions come first so static assets and blacklisted pages are never
//! rendered, even for a recognized crawler.

use std::sync::Arc;

use axum::http::Method;

use crate::config::PrerenderConfig;
use crate::policy::request::RequestDescriptor;
use crate::policy::rules::UrlRules;

const ESCAPED_FRAGMENT: &str = "_escaped_fragment_";
const BUFFERBOT_HEADER: &str = "x-bufferbot";

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub should_render: bool,
    /// URL to hand to the render backend. Meaningful only when rendering.
    pub target_url: String,
}

impl Verdict {
    fn pass(target_url: String) -> Self {
        Self {
            should_render: false,
            target_url,
        }
    }

    fn render(target_url: String) -> Self {
        Self {
            should_render: true,
            target_url,
        }
    }
}

/// Evaluates requests against a [`PrerenderConfig`].
///
/// Immutable after construction; share it freely across tasks.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: Arc<PrerenderConfig>,
    crawler_agents: Vec<String>,
    whitelist: Option<UrlRules>,
    blacklist: Option<UrlRules>,
}

impl DecisionEngine {
    pub fn new(config: Arc<PrerenderConfig>) -> Self {
        let crawler_agents = config
            .crawler_user_agents()
            .iter()
            .map(|ua| ua.to_lowercase())
            .filter(|ua| !ua.is_empty())
            .collect();
        let whitelist = config.whitelist().map(|p| UrlRules::compile(&p));
        let blacklist = config.blacklist().map(|p| UrlRules::compile(&p));

        Self {
            config,
            crawler_agents,
            whitelist,
            blacklist,
        }
    }

    pub fn config(&self) -> &PrerenderConfig {
        &self.config
    }

    pub fn decide(&self, req: &RequestDescriptor) -> Verdict {
        let target_url = self.target_url(req);

        if req.method != Method::GET && req.method != Method::HEAD {
            tracing::trace!(method = %req.method, "Not a GET request, passing through");
            return Verdict::pass(target_url);
        }

        if self.is_ignored_resource(&req.path) {
            tracing::trace!(path = %req.path, "Ignored extension, passing through");
            return Verdict::pass(target_url);
        }

        if let Some(blacklist) = &self.blacklist {
            let referer_hit = req.referer.as_deref().is_some_and(|r| blacklist.matches(r));
            if blacklist.matches(&target_url) || referer_hit {
                tracing::debug!(url = %target_url, "Blacklisted, passing through");
                return Verdict::pass(target_url);
            }
        }

        if let Some(whitelist) = &self.whitelist {
            if !whitelist.matches(&target_url) {
                tracing::debug!(url = %target_url, "Not whitelisted, passing through");
                return Verdict::pass(target_url);
            }
        }

        if has_escaped_fragment(req) {
            tracing::debug!(url = %target_url, "Escaped fragment requested, rendering");
            return Verdict::render(target_url);
        }

        let Some(user_agent) = req.user_agent.as_deref().filter(|ua| !ua.trim().is_empty())
        else {
            return Verdict::pass(target_url);
        };

        if self.is_crawler(user_agent) {
            tracing::debug!(url = %target_url, user_agent = %user_agent, "Crawler detected, rendering");
            return Verdict::render(target_url);
        }

        if req.headers.contains_key(BUFFERBOT_HEADER) {
            tracing::debug!(url = %target_url, "Buffer bot detected, rendering");
            return Verdict::render(target_url);
        }

        Verdict::pass(target_url)
    }

    fn is_ignored_resource(&self, path: &str) -> bool {
        self.config
            .extensions_to_ignore()
            .iter()
            .any(|ext| !ext.is_empty() && path.ends_with(ext.as_str()))
    }

    fn is_crawler(&self, user_agent: &str) -> bool {
        let ua = user_agent.to_lowercase();
        self.crawler_agents.iter().any(|token| ua.contains(token.as_str()))
    }

    /// Canonical URL reported to the backend: the forwarded URL if the
    /// request carried one, else the request URL, with the configured
    /// protocol swapped in.
    fn target_url(&self, req: &RequestDescriptor) -> String {
        let url = req.forwarded_url.as_deref().unwrap_or(&req.url);
        match self.config.protocol() {
            Some(protocol) => replace_scheme(url, protocol),
            None => url.to_string(),
        }
    }
}

fn has_escaped_fragment(req: &RequestDescriptor) -> bool {
    req.query.as_deref().is_some_and(|q| {
        q.split('&')
            .any(|pair| pair.split('=').next() == Some(ESCAPED_FRAGMENT))
    })
}

fn replace_scheme(url: &str, protocol: &str) -> String {
    let protocol = protocol.trim().trim_end_matches("://");
    match url.split_once("://") {
        Some((_, rest)) => format!("{protocol}://{rest}"),
        None => url.to_string(),
    }
}

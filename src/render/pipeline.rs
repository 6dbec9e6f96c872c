//! The render pipeline.
//!
//! # Flow per request
//! ```text
//! RECEIVED
//!     → DecisionEngine::decide
//!         false → PassThrough
//!         true  → before_render hook
//!                     Some(body) → Rendered(200, body)
//!                     None       → GET {service}{target}
//!                                     error / 4xx / 5xx → PassThrough
//!                                     response    → after_render hook → Rendered
//! ```
//!
//! Backend failures are logged and turned into `PassThrough`, so the caller
//! always gets a response from somewhere.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
};

use crate::config::PrerenderConfig;
use crate::error::PrerenderError;
use crate::hooks::{BackendResponse, HandlerRegistry, PrerenderEventHandler, ResponseMeta};
use crate::http::headers::{backend_request_headers, caller_response_headers};
use crate::observability::metrics;
use crate::policy::{DecisionEngine, RequestDescriptor, Verdict};
use crate::render::client::build_client;

/// Header carrying the service token on backend requests.
pub const PRERENDER_TOKEN_HEADER: &str = "x-prerender-token";

/// Result of running a request through the pipeline.
#[derive(Debug)]
pub enum RenderOutcome {
    /// Serve the request normally.
    PassThrough,
    /// Send this response instead.
    Rendered(Response<Body>),
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, RenderOutcome::Rendered(_))
    }
}

/// Shared prerender state: policy, pooled client and event handler.
///
/// Build one per process and share it behind an `Arc`.
pub struct Prerender {
    config: Arc<PrerenderConfig>,
    engine: DecisionEngine,
    client: ArcSwapOption<reqwest::Client>,
    handler: Arc<dyn PrerenderEventHandler>,
    /// False once `destroy` is about to run. Hook calls hold the read side.
    hooks_open: RwLock<bool>,
}

impl Prerender {
    /// Build the pipeline, resolving the event handler through `registry`.
    ///
    /// Fails only on configuration errors (malformed timeout, proxy port or
    /// pool size); those must abort startup.
    pub fn from_config(
        config: PrerenderConfig,
        registry: &HandlerRegistry,
    ) -> Result<Self, PrerenderError> {
        let handler = registry.resolve(&config);
        Self::with_handler(config, handler)
    }

    /// Build the pipeline with an explicit event handler.
    pub fn with_handler(
        config: PrerenderConfig,
        handler: Arc<dyn PrerenderEventHandler>,
    ) -> Result<Self, PrerenderError> {
        let client = build_client(&config)?;
        let config = Arc::new(config);
        let engine = DecisionEngine::new(config.clone());

        tracing::info!(
            service_url = %config.prerender_service_url(),
            crawler_agents = config.crawler_user_agents().len(),
            ignored_extensions = config.extensions_to_ignore().len(),
            whitelist = config.whitelist().is_some(),
            blacklist = config.blacklist().is_some(),
            "Prerender pipeline ready"
        );

        Ok(Self {
            config,
            engine,
            client: ArcSwapOption::from_pointee(client),
            handler,
            hooks_open: RwLock::new(true),
        })
    }

    pub fn config(&self) -> &PrerenderConfig {
        &self.config
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Describe an inbound request using the configured forwarded-URL header.
    pub fn describe<B>(&self, req: &axum::http::Request<B>) -> RequestDescriptor {
        RequestDescriptor::from_request(req, self.config.forwarded_url_header())
    }

    /// Decide, and render if the verdict says so.
    pub async fn handle(&self, request: &RequestDescriptor) -> RenderOutcome {
        if self.is_shut_down() {
            return RenderOutcome::PassThrough;
        }

        let verdict = self.engine.decide(request);
        metrics::record_decision(verdict.should_render);
        if !verdict.should_render {
            return RenderOutcome::PassThrough;
        }
        self.render(request, &verdict).await
    }

    /// Run the rendering branch for a request already judged renderable.
    pub async fn render(&self, request: &RequestDescriptor, verdict: &Verdict) -> RenderOutcome {
        let Some(client) = self.client.load_full() else {
            return RenderOutcome::PassThrough;
        };

        let Some(short_circuit) = self.with_live_handler(|h| h.before_render(request)) else {
            return RenderOutcome::PassThrough;
        };
        if let Some(body) = short_circuit.filter(|b| !b.is_empty()) {
            tracing::debug!(url = %verdict.target_url, "Served by before_render hook");
            metrics::record_backend_outcome("hook");
            return RenderOutcome::Rendered(html_response(StatusCode::OK, body));
        }

        let api_url = self.api_url(&verdict.target_url);
        let mut outbound = client
            .get(&api_url)
            .headers(backend_request_headers(&request.headers));
        if let Some(token) = self.config.prerender_token() {
            outbound = outbound.header(PRERENDER_TOKEN_HEADER, token);
        }

        tracing::debug!(url = %api_url, "Requesting prerendered page");
        let started = Instant::now();

        let response = match outbound.send().await {
            Ok(response) => response,
            Err(e) => {
                let outcome = if e.is_timeout() { "timeout" } else { "error" };
                tracing::warn!(url = %api_url, error = %e, "Render backend unreachable, passing through");
                metrics::record_backend_request(outcome, started);
                return RenderOutcome::PassThrough;
            }
        };

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            let outcome = if status.is_server_error() {
                "server_error"
            } else {
                "client_error"
            };
            tracing::warn!(url = %api_url, status = %status, "Render backend failed, passing through");
            metrics::record_backend_request(outcome, started);
            return RenderOutcome::PassThrough;
        }

        let backend = BackendResponse {
            status,
            headers: response.headers().clone(),
            url: api_url,
            elapsed: started.elapsed(),
        };

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(url = %backend.url, error = %e, "Failed to read render body, passing through");
                metrics::record_backend_request("error", started);
                return RenderOutcome::PassThrough;
            }
        };
        metrics::record_backend_request("ok", started);

        let mut meta = ResponseMeta {
            status,
            headers: caller_response_headers(&backend.headers),
        };
        let Some(replacement) =
            self.with_live_handler(|h| h.after_render(request, &mut meta, &backend, &html))
        else {
            tracing::debug!(url = %verdict.target_url, "Pipeline shut down during render, passing through");
            return RenderOutcome::PassThrough;
        };
        let body = replacement.filter(|b| !b.is_empty()).unwrap_or(html);

        tracing::info!(
            url = %verdict.target_url,
            status = %meta.status,
            elapsed_ms = backend.elapsed.as_millis() as u64,
            "Served prerendered page"
        );

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = meta.status;
        *response.headers_mut() = meta.headers;
        RenderOutcome::Rendered(response)
    }

    /// Release the pooled client and destroy the event handler.
    ///
    /// Safe to call more than once; only the first call has an effect.
    /// Every request after it passes through.
    pub fn shutdown(&self) {
        if self.client.swap(None).is_some() {
            // Waits for hook calls already running; later ones see the flag.
            *self.hooks_open.write().unwrap_or_else(PoisonError::into_inner) = false;
            self.handler.destroy();
            tracing::info!("Prerender pipeline shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.client.load().is_none()
    }

    /// Run `f` against the handler unless shutdown has begun.
    fn with_live_handler<R>(&self, f: impl FnOnce(&dyn PrerenderEventHandler) -> R) -> Option<R> {
        let open = self.hooks_open.read().unwrap_or_else(PoisonError::into_inner);
        if !*open {
            return None;
        }
        Some(f(self.handler.as_ref()))
    }

    fn api_url(&self, target_url: &str) -> String {
        let mut service = self.config.prerender_service_url();
        if !service.ends_with('/') {
            service.push('/');
        }
        service.push_str(target_url);
        service
    }
}

impl std::fmt::Debug for Prerender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prerender")
            .field("engine", &self.engine)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

fn html_response(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHandler {
        destroyed: AtomicUsize,
    }

    impl PrerenderEventHandler for CountingHandler {
        fn destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn prerender(pairs: &[(&str, &str)], handler: Arc<dyn PrerenderEventHandler>) -> Prerender {
        let raw: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Prerender::with_handler(PrerenderConfig::new(raw), handler).unwrap()
    }

    #[test]
    fn test_api_url_adds_slash() {
        let p = prerender(
            &[("prerenderServiceUrl", "http://render:3000")],
            Arc::new(crate::hooks::NoopHandler),
        );
        assert_eq!(
            p.api_url("https://example.com/a?b=1"),
            "http://render:3000/https://example.com/a?b=1"
        );

        let p = prerender(
            &[("prerenderServiceUrl", "http://render:3000/")],
            Arc::new(crate::hooks::NoopHandler),
        );
        assert_eq!(p.api_url("https://example.com/"), "http://render:3000/https://example.com/");
    }

    #[test]
    fn test_invalid_timeout_fails_construction() {
        let raw: HashMap<String, String> =
            [("socketTimeout".to_string(), "not_an_int".to_string())].into_iter().collect();
        let result = Prerender::from_config(PrerenderConfig::new(raw), &HandlerRegistry::new());
        assert!(matches!(result, Err(PrerenderError::InvalidNumber { .. })));
    }

    #[test]
    fn test_shutdown_destroys_handler_once() {
        let handler = Arc::new(CountingHandler::default());
        let p = prerender(&[], handler.clone());

        assert!(!p.is_shut_down());
        p.shutdown();
        p.shutdown();
        assert!(p.is_shut_down());
        assert_eq!(handler.destroyed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shut_down_pipeline_passes_through() {
        let p = prerender(&[], Arc::new(crate::hooks::NoopHandler));
        p.shutdown();

        let req = axum::http::Request::builder()
            .uri("http://example.com/")
            .header("User-Agent", "Googlebot/2.1")
            .body(())
            .unwrap();
        let outcome = p.handle(&p.describe(&req)).await;
        assert!(!outcome.is_rendered());
    }
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the origin proxy handler
//! - Wire up middleware (prerender, timeout, request ID, tracing)
//! - Bind server to listener
//! - Forward pass-through requests to the origin application
//! - Shut the prerender pipeline down once the server stops

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        HeaderMap, HeaderValue, Request, StatusCode, Uri,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ConfigError, GatewayConfig};
use crate::http::headers::strip_hop_by_hop;
use crate::http::middleware::prerender_middleware;
use crate::http::request::{request_id, UuidRequestId};
use crate::render::Prerender;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Parsed origin location.
#[derive(Debug, Clone)]
pub struct Origin {
    pub scheme: Scheme,
    pub authority: Authority,
}

impl Origin {
    /// Parse an `http://host:port` origin URL.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let uri: Uri = raw
            .parse()
            .map_err(|e| format!("invalid origin url `{raw}`: {e}"))?;
        let scheme = uri
            .scheme()
            .cloned()
            .ok_or_else(|| format!("origin url `{raw}` has no scheme"))?;
        if scheme != Scheme::HTTP {
            return Err(format!("origin url `{raw}` must use http"));
        }
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| format!("origin url `{raw}` has no host"))?;
        Ok(Self { scheme, authority })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub origin: Arc<Origin>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server: prerender middleware in front of a reverse-proxied origin.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    prerender: Arc<Prerender>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig, prerender: Arc<Prerender>) -> Result<Self, ConfigError> {
        let origin = Origin::parse(&config.origin.url).map_err(ConfigError::invalid)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            origin: Arc::new(origin),
            client,
        };

        let router = Self::build_router(&config, state, prerender.clone());
        Ok(Self {
            router,
            config,
            prerender,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState, prerender: Arc<Prerender>) -> Router {
        Router::new()
            .route("/{*path}", any(origin_handler))
            .route("/", any(origin_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(prerender, prerender_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, then shut the prerender
    /// pipeline down.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            origin = %self.config.origin.url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        self.prerender.shutdown();
        tracing::info!("HTTP server stopped");
        result
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Forward a pass-through request to the origin application.
async fn origin_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(state.origin.scheme.clone());
    uri_parts.authority = Some(state.origin.authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    let uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Could not build origin URI");
            return (StatusCode::BAD_REQUEST, "Invalid request target").into_response();
        }
    };

    let mut headers = strip_hop_by_hop(&parts.headers);
    append_forwarded_for(&mut headers, peer);

    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
    if let Some(h) = builder.headers_mut() {
        *h = headers;
    }
    let outbound = match builder.body(body) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build origin request");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to build origin request")
                .into_response();
        }
    };

    match state.client.request(outbound).await {
        Ok(response) => {
            let (mut parts, body) = response.into_parts();
            parts.headers = strip_hop_by_hop(&parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Origin request failed");
            (StatusCode::BAD_GATEWAY, "Origin request failed").into_response()
        }
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, peer: SocketAddr) {
    let ip = peer.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{existing}, {ip}"),
        None => ip,
    };
    if let Ok(v) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, v);
    }
}

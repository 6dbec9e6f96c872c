//! Prerender middleware.
//! Serves rendered snapshots to crawlers and passes everyone else through.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::request::request_id;
use crate::render::{Prerender, RenderOutcome};

/// Axum middleware wrapping an application with the render pipeline.
///
/// ```ignore
/// let app = Router::new()
///     .route("/", get(index))
///     .layer(axum::middleware::from_fn_with_state(prerender, prerender_middleware));
/// ```
pub async fn prerender_middleware(
    State(prerender): State<Arc<Prerender>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let descriptor = prerender.describe(&req);

    match prerender.handle(&descriptor).await {
        RenderOutcome::Rendered(response) => {
            tracing::debug!(
                request_id = %request_id(req.headers()),
                path = %descriptor.path,
                status = %response.status(),
                "Responding with prerendered page"
            );
            response
        }
        RenderOutcome::PassThrough => next.run(req).await,
    }
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `prerender_decisions_total` (counter): verdicts by `verdict` (render|pass)
//! - `prerender_backend_requests_total` (counter): backend calls by `outcome`
//!   (ok|timeout|error|client_error|server_error|hook)
//! - `prerender_backend_duration_seconds` (histogram): backend latency
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus
//! exporter, so library users pay nothing unless they opt in.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(render: bool) {
    let verdict = if render { "render" } else { "pass" };
    counter!("prerender_decisions_total", "verdict" => verdict).increment(1);
}

/// Outcomes that did not involve a backend round trip.
pub fn record_backend_outcome(outcome: &'static str) {
    counter!("prerender_backend_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_backend_request(outcome: &'static str, started: Instant) {
    record_backend_outcome(outcome);
    histogram!("prerender_backend_duration_seconds").record(started.elapsed().as_secs_f64());
}

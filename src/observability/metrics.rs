//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (requests, latency, route table size)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `router_requests_total` (counter): dispatched requests by method, status
//! - `router_request_duration_seconds` (histogram): dispatch latency by method
//! - `router_routes_registered` (gauge): routes added across all apps
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Histogram buckets tuned for in-process handler latencies

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::{Method, StatusCode};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "router_requests_total";
pub const REQUEST_DURATION: &str = "router_request_duration_seconds";
pub const ROUTES_REGISTERED: &str = "router_routes_registered";

const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), LATENCY_BUCKETS)?
        .install()?;

    metrics::describe_counter!(REQUESTS_TOTAL, "Requests dispatched by the router");
    metrics::describe_histogram!(REQUEST_DURATION, "Time spent dispatching a request");
    metrics::describe_gauge!(ROUTES_REGISTERED, "Routes registered");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a finished dispatch.
pub fn record_dispatch(method: &Method, status: StatusCode, start: Instant) {
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);

    metrics::histogram!(REQUEST_DURATION, "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_route_registered() {
    metrics::gauge!(ROUTES_REGISTERED).increment(1.0);
}

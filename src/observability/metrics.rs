//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, route
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_active_websockets` (gauge): current WebSocket relay count
//! - `proxy_upstream_errors_total` (counter): upstream failures by kind
//!
//! # Design Decisions
//! - Low-overhead updates (atomic operations in the recorder)
//! - Prometheus exposition via a scrape endpoint on its own address

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and scrape endpoint.
///
/// Failure to install is logged and otherwise ignored; the proxy keeps
/// serving traffic without metrics.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        return;
    }

    describe_counter!("proxy_requests_total", "Total requests, by method, status and route");
    describe_histogram!(
        "proxy_request_duration_seconds",
        "Request latency distribution, by route"
    );
    describe_gauge!("proxy_active_websockets", "Active WebSocket relays");
    describe_counter!("proxy_upstream_errors_total", "Upstream failures, by kind");

    tracing::info!(address = %addr, "Metrics exporter listening");
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string(),
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record an upstream failure ("timeout" or "unreachable").
pub fn record_upstream_error(kind: &'static str, upstream: &str) {
    counter!(
        "proxy_upstream_errors_total",
        "kind" => kind,
        "upstream" => upstream.to_string(),
    )
    .increment(1);
}

/// Publish the current WebSocket relay count.
pub fn record_active_websockets(count: u64) {
    gauge!("proxy_active_websockets").set(count as f64);
}

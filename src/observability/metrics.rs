//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_upstream_failures_total` (counter): connection failures by service, instance
//! - `gateway_rate_limited_total` (counter): denied admissions by reason
//! - `gateway_store_degraded_total` (counter): store outages by operation
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, which keeps tests and CLI paths free
//! - The Prometheus exporter serves its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_failure(service: &str, instance: &str) {
    counter!(
        "gateway_upstream_failures_total",
        "service" => service.to_string(),
        "instance" => instance.to_string()
    )
    .increment(1);
}

pub fn record_rate_limited(reason: &'static str) {
    counter!("gateway_rate_limited_total", "reason" => reason).increment(1);
}

pub fn record_store_degraded(operation: &'static str) {
    counter!("gateway_store_degraded_total", "operation" => operation).increment(1);
}

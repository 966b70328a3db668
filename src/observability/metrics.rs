//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus exporter when enabled
//! - Record per-route, per-backend and per-upstream measurements
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `backend_calls_total` (counter): RPC calls by backend, operation, outcome
//! - `backend_call_duration_seconds` (histogram): RPC latency by backend, operation
//! - `backend_connection_state` (gauge): 0=idle 1=connecting 2=ready 3=degraded 4=closed
//! - `upstream_forwards_total` (counter): forwarded requests by upstream, status
//! - `upstream_forward_duration_seconds` (histogram): forward latency by upstream
//!
//! # Design Decisions
//! - Without an installed recorder every call here is a no-op
//! - Label values are bounded: routes and operations are static names

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::client::ConnectionState;

/// Install the Prometheus exporter, serving scrapes on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, elapsed: Duration) {
    counter!("gateway_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route)
        .record(elapsed.as_secs_f64());
}

pub fn record_call(backend: &str, operation: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!(
        "backend_calls_total",
        "backend" => backend.to_string(),
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "backend_call_duration_seconds",
        "backend" => backend.to_string(),
        "operation" => operation
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_connection_state(backend: &str, state: ConnectionState) {
    gauge!("backend_connection_state", "backend" => backend.to_string()).set(state as u8 as f64);
}

pub fn record_forward(upstream: &str, status: u16, elapsed: Duration) {
    counter!(
        "upstream_forwards_total",
        "upstream" => upstream.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("upstream_forward_duration_seconds", "upstream" => upstream.to_string())
        .record(elapsed.as_secs_f64());
}

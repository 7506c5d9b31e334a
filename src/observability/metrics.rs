//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): inbound requests by method, status
//! - `relay_request_duration_seconds` (histogram): inbound latency
//! - `relay_datasource_requests_total` (counter): outbound calls by operation, method, outcome
//! - `relay_datasource_duration_seconds` (histogram): outbound latency including retries

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::datasource::{DataSourceResult, Operation};

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed inbound request.
pub fn record_request(method: &Method, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("relay_requests_total", &labels).increment(1);
    metrics::histogram!("relay_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// Record a completed data source call.
pub fn record_datasource_call<T>(operation: Operation, method: &Method, outcome: &DataSourceResult<T>, start: Instant) {
    let outcome_label = match outcome {
        Ok(_) => "success",
        Err(e) => match e.kind() {
            crate::datasource::ErrorKind::NotWritable => "not_writable",
            crate::datasource::ErrorKind::TransportError => "transport_error",
            crate::datasource::ErrorKind::MalformedResponse => "malformed_response",
        },
    };
    let labels = [
        ("operation", operation.as_str().to_string()),
        ("method", method.to_string()),
        ("outcome", outcome_label.to_string()),
    ];
    metrics::counter!("relay_datasource_requests_total", &labels).increment(1);
    metrics::histogram!("relay_datasource_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

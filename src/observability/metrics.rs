//! Metrics collection and exposition.
//!
//! # Metrics
//! - `server_requests_total` (counter): completed requests by method, status
//! - `server_request_duration_seconds` (histogram): latency distribution
//! - `server_requests_in_flight` (gauge): requests currently processing
//! - `server_shutdowns_total` (counter): coordinated runs by outcome
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    ::metrics::counter!("server_requests_total", &labels).increment(1);
    ::metrics::histogram!("server_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn set_in_flight(count: u64) {
    ::metrics::gauge!("server_requests_in_flight").set(count as f64);
}

pub fn record_shutdown(outcome: &'static str) {
    ::metrics::counter!("server_shutdowns_total", "outcome" => outcome).increment(1);
}

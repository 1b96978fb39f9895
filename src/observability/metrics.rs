//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hub_requests_total` (counter): dispatched requests by method, status
//! - `hub_request_duration_seconds` (histogram): dispatch latency
//! - `hub_waits_total` (counter): finished waits by kind, outcome
//! - `hub_wait_duration_seconds` (histogram): wait latency by kind
//! - `hub_active_sessions` (gauge): open browser sessions
//! - `hub_command_retries_total` (counter): queue retries by command
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; with no exporter installed it is a no-op
//! - The Prometheus listener is only installed when `observability.metrics_enabled` is set

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Install the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "hub_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("hub_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_wait(kind: &'static str, outcome: &'static str, elapsed: Duration) {
    ::metrics::counter!("hub_waits_total", "kind" => kind, "outcome" => outcome).increment(1);
    ::metrics::histogram!("hub_wait_duration_seconds", "kind" => kind).record(elapsed.as_secs_f64());
}

pub fn record_active_sessions(count: usize) {
    ::metrics::gauge!("hub_active_sessions").set(count as f64);
}

pub fn record_command_retry(command: &str) {
    ::metrics::counter!("hub_command_retries_total", "command" => command.to_string()).increment(1);
}

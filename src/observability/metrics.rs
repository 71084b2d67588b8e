//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mockapi_requests_total` (counter): served requests by listener, binding, status
//! - `mockapi_body_failures_total` (counter): responses sent without their body
//! - `mockapi_live_listeners` (gauge): workers currently registered
//! - `mockapi_reloads_total` (counter): reload attempts that reached the registry
//! - `mockapi_bind_failures_total` (counter): listeners that failed to start
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library code
//!   and tests never need to set one up
//! - The Prometheus endpoint is opt-in

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(listener: &str, binding: &str, status: u16) {
    counter!(
        "mockapi_requests_total",
        "listener" => listener.to_string(),
        "binding" => binding.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_body_failure(listener: &str, binding: &str) {
    counter!(
        "mockapi_body_failures_total",
        "listener" => listener.to_string(),
        "binding" => binding.to_string()
    )
    .increment(1);
}

pub fn set_live_listeners(count: usize) {
    gauge!("mockapi_live_listeners").set(count as f64);
}

pub fn record_reload() {
    counter!("mockapi_reloads_total").increment(1);
}

pub fn record_bind_failure(listener: &str) {
    counter!("mockapi_bind_failures_total", "listener" => listener.to_string()).increment(1);
}

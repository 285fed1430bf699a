//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cache_control_decisions_total` (counter): responses by decision
//!   (`unsafe_method`, `skipped`, `fallback`, `matched`)

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one cache header decision.
pub fn record_decision(decision: &'static str) {
    counter!("cache_control_decisions_total", "decision" => decision).increment(1);
}

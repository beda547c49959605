//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Expose a Prometheus-compatible metrics endpoint
//! - Record message and configuration activity
//!
//! # Metrics
//! - `vipservice_messages_received_total` (counter): deliveries by source
//! - `vipservice_config_reloads_total` (counter): applied config refreshes
//!
//! # Design Decisions
//! - Metric updates are cheap atomic increments
//! - Exporter failure is logged, never fatal; the service runs without
//!   metrics rather than refusing to start

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on the given address.
pub fn init_metrics(address: SocketAddr) {
    match PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
    {
        Ok(()) => {
            tracing::info!(address = %address, "Metrics exporter started");
        }
        Err(error) => {
            tracing::error!(
                address = %address,
                error = %error,
                "Failed to start metrics exporter"
            );
        }
    }
}

/// Count one delivery taken from a queue or topic.
pub fn record_message_received(source: &str) {
    metrics::counter!(
        "vipservice_messages_received_total",
        "source" => source.to_string()
    )
    .increment(1);
}

/// Count one configuration refresh that was applied.
pub fn record_config_reload() {
    metrics::counter!("vipservice_config_reloads_total").increment(1);
}

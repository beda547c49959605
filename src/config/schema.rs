//! Configuration schema definitions.
//!
//! The service owns one explicit configuration value, built from the remote
//! configuration document at startup. The live value sits behind an
//! `ArcSwap` so the refresh handler can replace it without locking readers.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

/// Handle to the live configuration, shared across subsystems.
///
/// Readers take cheap snapshots via `load`/`load_full`; the refresh handler
/// replaces the whole value with `store`.
pub type SharedConfig = Arc<ArcSwap<ServiceConfig>>;

/// Remote configuration for the service.
///
/// Built from the flattened key/value document served by the configuration
/// server. Required keys carry no fallbacks; the loader rejects documents
/// that omit them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Broker address (e.g. "redis://broker:6379").
    pub broker_url: String,

    /// Topic carrying configuration refresh events.
    pub config_event_bus: String,

    /// Port for the HTTP listener.
    pub server_port: u16,

    /// Enable the Prometheus metrics exporter.
    #[serde(default)]
    pub metrics_enabled: bool,

    /// Metrics exporter bind address.
    #[serde(default = "default_metrics_address")]
    pub metrics_address: String,
}

pub(crate) fn default_metrics_address() -> String {
    "0.0.0.0:9090".to_string()
}

impl ServiceConfig {
    /// Wrap the configuration for shared, atomically swappable access.
    pub fn into_shared(self) -> SharedConfig {
        Arc::new(ArcSwap::from_pointee(self))
    }

    /// Names of the keys whose values differ between `self` and `other`.
    ///
    /// Used by the refresh handler to log what a reload actually changed.
    pub fn changed_keys(&self, other: &ServiceConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.broker_url != other.broker_url {
            changed.push("broker_url");
        }
        if self.config_event_bus != other.config_event_bus {
            changed.push("config_event_bus");
        }
        if self.server_port != other.server_port {
            changed.push("server_port");
        }
        if self.metrics_enabled != other.metrics_enabled {
            changed.push("metrics_enabled");
        }
        if self.metrics_address != other.metrics_address {
            changed.push("metrics_address");
        }
        changed
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            broker_url: "redis://localhost:6379".to_string(),
            config_event_bus: "springCloudBus".to_string(),
            server_port: 6868,
            metrics_enabled: false,
            metrics_address: default_metrics_address(),
        }
    }
}

//! Configuration refresh via the event bus.
//!
//! # Data Flow
//! ```text
//! event bus message
//!     → RefreshEvent (decode)
//!     → destination match ("vipservice:**")
//!     → ConfigServerClient::load (re-fetch)
//!     → ArcSwap store (atomic swap)
//!     → changed keys logged
//! ```
//!
//! # Design Decisions
//! - Refresh is advisory: any failure keeps the previous config live
//! - Non-matching and unknown events are ignored, not errors
//! - Port, broker address and metrics settings only take effect on restart;
//!   a reload that touches them logs a warning instead of re-binding

use std::sync::Arc;

use serde::Deserialize;

use crate::config::loader::ConfigServerClient;
use crate::config::schema::SharedConfig;
use crate::observability::metrics;

/// Event type that requests a configuration reload.
const REFRESH_EVENT_TYPE: &str = "RefreshRemoteApplicationEvent";

/// Refresh event as carried on the configuration event bus.
///
/// Shape follows the Spring Cloud Bus envelope so this service can share a
/// bus with JVM peers. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshEvent {
    /// Event discriminator, e.g. `RefreshRemoteApplicationEvent`.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Service that emitted the event.
    #[serde(rename = "originService", default)]
    pub origin_service: String,

    /// Target service pattern, e.g. `vipservice:**`.
    #[serde(rename = "destinationService", default)]
    pub destination_service: String,

    /// Event id for correlation.
    #[serde(default)]
    pub id: String,
}

impl RefreshEvent {
    /// Whether this event asks `application` to refresh its configuration.
    pub fn targets(&self, application: &str) -> bool {
        self.kind == REFRESH_EVENT_TYPE && matches_destination(&self.destination_service, application)
    }
}

/// Match a destination pattern against an application name.
///
/// Patterns are `{application}:{instance}`; the instance part is irrelevant
/// here because every instance refreshes itself. `*` and `**` in the
/// application part address everyone.
fn matches_destination(destination: &str, application: &str) -> bool {
    let application_part = destination.split(':').next().unwrap_or("");
    application_part == application || application_part == "*" || application_part == "**"
}

/// Handle one message from the configuration event bus.
///
/// Decodes the event, checks that it targets this application, re-fetches
/// the configuration and swaps it in. All failures are logged and
/// swallowed; a bad broadcast must not take down a healthy service.
pub async fn handle_refresh_event(
    body: &[u8],
    application: &str,
    loader: &ConfigServerClient,
    shared: &SharedConfig,
) {
    let event: RefreshEvent = match serde_json::from_slice(body) {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(%error, "Discarding undecodable event bus message");
            return;
        }
    };

    if !event.targets(application) {
        tracing::debug!(
            kind = %event.kind,
            destination = %event.destination_service,
            "Ignoring event bus message not addressed to this service"
        );
        return;
    }

    tracing::info!(
        origin = %event.origin_service,
        event_id = %event.id,
        "Configuration refresh requested"
    );

    match loader.load().await {
        Ok(new_config) => {
            let previous = shared.load_full();
            let changed = previous.changed_keys(&new_config);
            shared.store(Arc::new(new_config));
            metrics::record_config_reload();

            if changed.is_empty() {
                tracing::info!("Configuration reloaded; no keys changed");
            } else {
                tracing::info!(changed = ?changed, "Configuration reloaded");
                if changed.contains(&"server_port") {
                    tracing::warn!("server_port changed; the new port takes effect on restart");
                }
                if changed.contains(&"broker_url") {
                    tracing::warn!("broker_url changed; the new address takes effect on restart");
                }
                // The exporter installs once at startup and cannot be moved
                // or torn down afterwards.
                if changed.contains(&"metrics_enabled") || changed.contains(&"metrics_address") {
                    tracing::warn!("metrics settings changed; they take effect on restart");
                }
            }
        }
        Err(error) => {
            tracing::warn!(%error, "Configuration refresh failed; keeping previous configuration");
        }
    }
}

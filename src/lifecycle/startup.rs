//! Startup orchestration.
//!
//! # Responsibilities
//! - Parse CLI flags
//! - Load and validate remote configuration
//! - Initialize subsystems in dependency order
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and flows back to the entry
//!   point, which decides the exit code
//! - Subsystems initialize in order, not concurrently
//! - The listener starts last (traffic only when ready)
//! - The broker connection is released exactly once, on every exit path

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use crate::config::loader::{ConfigError, ConfigServerClient};
use crate::config::refresh;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::messaging::{MessagingClient, MessagingError};
use crate::observability::metrics;

/// Application name, used for config lookup and consumer naming.
pub const APP_NAME: &str = "vipservice";

/// Work queue this service consumes.
pub const VIP_QUEUE: &str = "vip_queue";

/// Command-line flags.
///
/// Flag spellings are part of the deployment contract; do not rename.
#[derive(Debug, Parser)]
#[command(name = "vipservice", about = "VIP handling microservice", version)]
pub struct Args {
    /// Address of the configuration server.
    #[arg(long = "configServerUrl", default_value = "http://configserver:8888")]
    pub config_server_url: String,

    /// Environment profile to load configuration for.
    #[arg(long = "profile", default_value = "test")]
    pub profile: String,

    /// Branch to fetch configuration from.
    #[arg(long = "configBranch", default_value = "master")]
    pub config_branch: String,
}

/// Errors that can occur during service startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Remote configuration could not be loaded or was invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The broker connection could not be established.
    #[error("messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// A subscription could not be set up.
    #[error("could not subscribe to {target}: {source}")]
    Subscription {
        target: String,
        source: MessagingError,
    },

    /// Signal handlers could not be registered.
    #[error("could not install signal handlers: {0}")]
    Signals(std::io::Error),

    /// The HTTP port could not be bound.
    #[error("could not bind HTTP listener on port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    /// The HTTP server failed while serving.
    #[error("HTTP server error: {0}")]
    Server(std::io::Error),
}

/// Run the service bootstrap, then serve until shutdown.
///
/// Steps are a chain of hard dependencies: remote configuration, broker
/// connection, queue subscription, refresh subscription, shutdown wiring,
/// HTTP listener. Any failure before the serve loop returns immediately.
pub async fn run(args: &Args, shutdown: Shutdown) -> Result<(), StartupError> {
    let loader = ConfigServerClient::new(
        &args.config_server_url,
        APP_NAME,
        &args.profile,
        &args.config_branch,
    )?;
    let config = loader.load().await?;
    tracing::info!(
        broker_url = %config.broker_url,
        config_event_bus = %config.config_event_bus,
        server_port = config.server_port,
        "Configuration loaded"
    );

    if config.metrics_enabled {
        if let Ok(addr) = config.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let server_port = config.server_port;
    let broker_url = config.broker_url.clone();
    let event_bus = config.config_event_bus.clone();
    let shared_config = config.into_shared();

    let messaging = Arc::new(MessagingClient::new(&broker_url)?);
    messaging.connect().await?;

    // The queue handler is a placeholder contract: it logs the payload and
    // stays free of side effects, so plugging in real processing later
    // cannot change observable behavior retroactively.
    messaging
        .subscribe_to_queue(VIP_QUEUE, APP_NAME, |delivery| async move {
            tracing::info!(
                message_id = %delivery.message_id,
                queue = %delivery.source,
                payload = %delivery.body_text(),
                "Received VIP message"
            );
        })
        .await
        .map_err(|source| StartupError::Subscription {
            target: VIP_QUEUE.to_string(),
            source,
        })?;

    let refresh_loader = loader.clone();
    let refresh_config = shared_config.clone();
    messaging
        .subscribe_to_topic(&event_bus, APP_NAME, move |delivery| {
            let loader = refresh_loader.clone();
            let shared = refresh_config.clone();
            async move {
                refresh::handle_refresh_event(&delivery.body, APP_NAME, &loader, &shared).await;
            }
        })
        .await
        .map_err(|source| StartupError::Subscription {
            target: event_bus.clone(),
            source,
        })?;

    // Shutdown wiring. Receivers first, then the signal listener, so a
    // signal arriving during the remaining steps cannot be missed.
    let server_shutdown = shutdown.subscribe();
    let mut cleanup_shutdown = shutdown.subscribe();
    let _signals = signals::install(shutdown.clone()).map_err(StartupError::Signals)?;

    let cleanup_client = messaging.clone();
    tokio::spawn(async move {
        let _ = cleanup_shutdown.recv().await;
        if cleanup_client.close().await {
            tracing::info!("Broker connection released");
        }
    });

    let listener = TcpListener::bind(("0.0.0.0", server_port))
        .await
        .map_err(|source| StartupError::Bind {
            port: server_port,
            source,
        })?;

    let server = HttpServer::new(messaging.clone());
    let result = server.run(listener, server_shutdown).await;

    // The serve loop has returned; release the connection unless the
    // cleanup task already did.
    messaging.close().await;

    result.map_err(StartupError::Server)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_deployment_contract() {
        let args = Args::try_parse_from(["vipservice"]).unwrap();
        assert_eq!(args.config_server_url, "http://configserver:8888");
        assert_eq!(args.profile, "test");
        assert_eq!(args.config_branch, "master");
    }

    #[test]
    fn cli_flags_override_defaults() {
        let args = Args::try_parse_from([
            "vipservice",
            "--configServerUrl",
            "http://localhost:8888",
            "--profile",
            "dev",
            "--configBranch",
            "develop",
        ])
        .unwrap();

        assert_eq!(args.config_server_url, "http://localhost:8888");
        assert_eq!(args.profile, "dev");
        assert_eq!(args.config_branch, "develop");
    }

    #[test]
    fn snake_case_flag_spellings_are_rejected() {
        // The deployment contract uses camelCase flags; a renamed flag
        // must fail parsing instead of silently falling back to defaults.
        assert!(Args::try_parse_from(["vipservice", "--config-server-url", "http://x"]).is_err());
    }
}

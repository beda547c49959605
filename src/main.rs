//! VIP Handling Microservice
//!
//! Consumes VIP messages from the broker and follows centralized
//! configuration, built with Tokio and Axum.
//!
//! # Bootstrap Flow
//!
//! ```text
//!   CLI flags ──▶ config server fetch ──▶ validated ServiceConfig
//!                                               │
//!                                               ▼
//!                                     broker connect (Redis)
//!                                       │             │
//!                         vip_queue ◀───┘             └───▶ config event topic
//!                         (worker loop)                      (refresh handler)
//!                                               │
//!                                               ▼
//!                                     signal listener installed
//!                                               │
//!                                               ▼
//!                                     HTTP server (/health) blocks
//! ```
//!
//! # Exit Behavior
//!
//! The service has no successful-exit path. SIGINT/SIGTERM releases the
//! broker connection exactly once, then the process reports a non-zero
//! status; startup failures do the same.

use std::process::ExitCode;

use clap::Parser;

use vipservice::lifecycle::startup::{self, Args};
use vipservice::observability::logging;
use vipservice::Shutdown;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    logging::init_logging();

    tracing::info!(
        application = startup::APP_NAME,
        version = env!("CARGO_PKG_VERSION"),
        profile = %args.profile,
        "Service starting"
    );

    let shutdown = Shutdown::new();

    match startup::run(&args, shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
        }
        Err(error) => {
            tracing::error!(error = %error, "Fatal startup error");
        }
    }

    ExitCode::FAILURE
}

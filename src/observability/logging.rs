//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the whole process
//! - Configure the log filter from the environment
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - `RUST_LOG` overrides the built-in default filter

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// Call once, before anything logs. `RUST_LOG` takes precedence; without it
/// the service logs at info level.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vipservice=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

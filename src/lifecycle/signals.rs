//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGINT and SIGTERM
//! - Translate the first signal into a shutdown trigger
//!
//! # Design Decisions
//! - Handlers register synchronously inside `install`, before the blocking
//!   serve loop starts, so no termination request can be missed
//! - The wait itself runs in a dedicated task
//! - The process exits after the first signal; repeated signals are moot

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Install termination-signal handling.
///
/// Returns the handle of the task that waits for the first SIGINT or
/// SIGTERM, triggers `shutdown`, and finishes. By the time this function
/// returns, both handlers are registered.
#[cfg(unix)]
pub fn install(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        let received = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        };
        tracing::info!(signal = received, "Termination signal received");
        shutdown.trigger();
    }))
}

/// Install termination-signal handling.
///
/// Non-unix targets only get the interactive interrupt.
#[cfg(not(unix))]
pub fn install(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Signal listener failed");
            return;
        }
        tracing::info!(signal = "ctrl-c", "Termination signal received");
        shutdown.trigger();
    }))
}

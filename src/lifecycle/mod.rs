//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Connect broker → Subscribe → Install signals → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast to serve loop and cleanup task
//!     → broker connection closed exactly once → process exits non-zero
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then broker, listeners last
//! - The cleanup action is once-guarded; every exit path may invoke it
//! - The entry point owns the exit code; no process::exit in library code

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;

//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TcpListener
//!     → server.rs (Axum router, /health)
//!     → TimeoutLayer (request deadline)
//!     → TraceLayer (request spans)
//!     → graceful shutdown on broadcast receiver
//! ```

pub mod server;

pub use server::HttpServer;

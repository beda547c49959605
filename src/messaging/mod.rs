//! Messaging subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceConfig.broker_url
//!     → client.rs connect (shared connection: publish, ping)
//!     → subscribe_to_queue (dedicated connection, blocking pop loop)
//!     → subscribe_to_topic (pub/sub connection, fan-out stream)
//!     → async handlers, sequential per subscription
//!
//! On shutdown:
//!     close() fires the stop channel → workers exit → connection dropped
//! ```

pub mod client;

pub use client::{Delivery, MessagingClient, MessagingError};

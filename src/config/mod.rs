//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags (config server address, profile, branch)
//!     → loader.rs (fetch & flatten the remote document)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable value)
//!     → shared via ArcSwap to all subsystems
//!
//! On refresh event:
//!     refresh.rs matches the event to this service
//!     → loader.rs fetches the document again
//!     → validation.rs validates
//!     → atomic swap of Arc<ServiceConfig>
//!     → subsystems observe the new value
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes arrive as a whole new value
//! - Required keys fail fast and by name; optional keys have defaults
//! - Validation separates syntactic (parsing) from semantic checks

pub mod loader;
pub mod refresh;
pub mod schema;
pub mod validation;

pub use loader::{ConfigError, ConfigServerClient};
pub use schema::{ServiceConfig, SharedConfig};

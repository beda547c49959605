//! VIP Handling Microservice Library

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod messaging;
pub mod model;
pub mod observability;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use messaging::MessagingClient;

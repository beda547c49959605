//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router and middleware stack
//! - Serve the health surface until shutdown
//!
//! # Design Decisions
//! - The serve loop blocks the caller; shutdown arrives through the
//!   coordinator's broadcast receiver, not an inline signal wait
//! - Health reports component state, not just liveness, so orchestrators
//!   can tell a broker outage from a dead process

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::messaging::MessagingClient;

/// Request timeout for the health surface.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub messaging: Arc<MessagingClient>,
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over the shared broker handle.
    pub fn new(messaging: Arc<MessagingClient>) -> Self {
        let state = AppState { messaging };
        let router = Self::build_router(state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until the shutdown receiver fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Health endpoint.
///
/// 200 `UP` only while the broker answers; 503 `DEGRADED` otherwise, which
/// takes the instance out of rotation without restarting it.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let broker_up = state.messaging.ping().await;
    let (status_code, status) = if broker_up {
        (StatusCode::OK, "UP")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "DEGRADED")
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "components": {
                "broker": if broker_up { "UP" } else { "DOWN" },
            },
        })),
    )
}

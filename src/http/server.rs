//! Preview HTTP server.
//!
//! # Responsibilities
//! - Create an Axum Router with a stub handler
//! - Wire up middleware (tracing, timeout, cache headers)
//! - Serve until Ctrl+C
//!
//! Every response passes through the cache header middleware, so the server
//! shows exactly which headers a rule file produces for a given request.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    response::IntoResponse,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::http::middleware::{cache_control_middleware, CacheControlState};

/// HTTP server fronting a stub handler with the cache header middleware.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &AppConfig, state: CacheControlState) -> Self {
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &AppConfig, state: CacheControlState) -> Router {
        Router::new()
            .fallback(preview_handler)
            .layer(middleware::from_fn_with_state(state, cache_control_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Echoes the request line so the response has a body to hash.
async fn preview_handler(request: Request<Body>) -> impl IntoResponse {
    (
        StatusCode::OK,
        format!("{} {}\n", request.method(), request.uri().path()),
    )
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

//! HTTP server setup and routing

use crate::error::{Error, Result};
use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
}

/// Build the router with all routes
pub fn create_router(state: Arc<SharedState>) -> Router {
    let ctx = AppContext { state };

    Router::new()
        .route("/health", get(super::handlers::health))
        .nest(
            "/api/v1",
            Router::new()
                // Ingestion
                .route("/detection", post(super::handlers::ingest_detection))
                // Fused world
                .route("/world", get(super::handlers::get_world))
                .route("/world/consume", post(super::handlers::consume_world))
                .route("/world/reset", post(super::handlers::reset_world))
                // Threat assessment
                .route("/danger", post(super::handlers::publish_danger))
                .route("/modules", get(super::handlers::list_modules))
                // SSE event stream
                .route("/events", get(super::sse::event_stream)),
        )
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until `shutdown` resolves
pub async fn run(
    state: Arc<SharedState>,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}

//! Probe and metrics HTTP endpoints
//!
//! - `GET /healthz`: liveness, always OK while the process serves requests
//! - `GET /readyz`: readiness, OK once every controller is registered
//! - `GET /metrics`: Prometheus text format

use crate::error::ControllerError;
use crate::metrics::Metrics;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared state of the HTTP handlers
#[derive(Debug, Clone)]
pub struct ServerState {
    metrics: Metrics,
    ready: Arc<AtomicBool>,
}

impl ServerState {
    /// Create a state that reports not ready
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the provider ready
    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }
}

/// Create the router with all endpoints
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/readyz", get(readiness_check))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

/// Serve the endpoints on `addr` until the process exits
pub async fn serve(addr: SocketAddr, state: ServerState) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .inspect_err(|e| error!(%addr, "Failed to bind metrics server: {}", e))?;
    info!(%addr, "Serving probes and metrics");
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn readiness_check(State(state): State<ServerState>) -> Result<&'static str, StatusCode> {
    if state.ready.load(Ordering::Acquire) {
        Ok("READY")
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn get_metrics(State(state): State<ServerState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                e.to_string(),
            )
        }
    }
}

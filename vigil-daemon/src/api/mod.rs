//! HTTP API layer for the daemon.
//!
//! Each submodule handles the endpoints of one area.

pub mod error;
pub mod health;
pub mod pipeline;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use vigil_pipeline::Orchestrator;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            started_at: Instant::now(),
        }
    }
}

/// Create the API router with all endpoints.
pub fn create_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/pipeline", post(pipeline::execute_pipeline))
        .route("/api/pipeline/history", get(pipeline::list_history))
        .route("/api/pipeline/active", get(pipeline::list_active))
        .route("/api/pipeline/{id}", get(pipeline::get_run))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

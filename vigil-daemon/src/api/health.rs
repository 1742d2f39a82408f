//! Health check API handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::api::AppState;
use crate::health::DaemonHealth;

/// GET /health
///
/// 503 when the daemon cannot run pipelines at all, 200 otherwise.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<DaemonHealth>) {
    let uptime_secs = state.started_at.elapsed().as_secs();
    let report = DaemonHealth::collect(&state.orchestrator, uptime_secs).await;

    let status = if report.status.is_unhealthy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(report))
}

//! Pipeline API handlers.
//!
//! HTTP endpoints for executing pipelines and querying the run registry.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use vigil_pipeline::{PipelineRequest, PipelineResponse, PipelineRun, RunStatus};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// Query string for the history endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of runs to return (most recent first).
    pub limit: Option<usize>,
}

/// POST /api/pipeline
///
/// Runs the pipeline to completion. A failed run still returns its
/// envelope, with 502 because the scan back-end is the upstream at fault.
pub async fn execute_pipeline(
    State(state): State<AppState>,
    request: Result<Json<PipelineRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PipelineResponse>)> {
    let Json(request) = request?;
    tracing::info!(kind = %request.kind, "pipeline requested");

    let response = state.orchestrator.execute_pipeline(request).await;
    let status = match response.status {
        RunStatus::Failed => StatusCode::BAD_GATEWAY,
        RunStatus::Completed => StatusCode::OK,
        RunStatus::Running => {
            return Err(ApiError::Internal(format!(
                "run {} returned while still running",
                response.pipeline_id
            )));
        }
    };

    Ok((status, Json(response)))
}

/// GET /api/pipeline/{id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PipelineRun>> {
    tracing::debug!(run_id = %id, "run lookup");

    state
        .orchestrator
        .get_run(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("pipeline run {id} not found")))
}

/// GET /api/pipeline/history?limit=N
pub async fn list_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<PipelineRun>>> {
    let Query(query) = query?;
    Ok(Json(state.orchestrator.list_history(query.limit)))
}

/// GET /api/pipeline/active
pub async fn list_active(State(state): State<AppState>) -> Json<Vec<PipelineRun>> {
    Json(state.orchestrator.list_active())
}

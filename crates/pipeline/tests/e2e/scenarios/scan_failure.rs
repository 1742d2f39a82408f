//! Stage 1 failures abort the run.

use std::sync::Arc;

use serde_json::json;

use vigil_core::stage::StageName;
use vigil_core::types::ScanKind;
use vigil_pipeline::{Orchestrator, PipelineRequest, PipelineResponse, RunStatus, StageState};

use crate::helpers::collaborators::StubGenerator;
use crate::helpers::full_orchestrator;
use crate::helpers::stages::{PanickingStage, StaticScan};

/// An unavailable scanner fails the run, leaves stages 2-5 pending
/// and marks the response retryable.
#[tokio::test]
async fn test_e2e_scanner_unavailable_fails_run() {
    // Given: a scan back-end that is down
    let (orchestrator, mocks) = full_orchestrator(
        StaticScan::failing("scanner unavailable"),
        StubGenerator::answering(),
    );

    // When
    let response = orchestrator
        .execute_pipeline(PipelineRequest::new(ScanKind::CodeAnalysis, json!({})))
        .await;

    // Then: the envelope is a retryable error
    assert!(!response.success);
    assert_eq!(response.status, RunStatus::Failed);
    assert!(response.can_retry);
    assert_eq!(response.error.as_deref(), Some("scanner unavailable"));
    assert!(response.scan_results.is_none());

    // And: later stages never ran
    assert_eq!(response.per_stage_status[&StageName::Scan], StageState::Failed);
    for stage in &StageName::ORDERED[1..] {
        assert_eq!(response.per_stage_status[stage], StageState::Pending);
    }
    assert_eq!(mocks.generator.calls(), 0);
    assert!(mocks.store.snapshots().is_empty());

    // And: the run is in history as failed
    let run = orchestrator
        .get_run(&response.pipeline_id)
        .expect("should find run");
    assert_eq!(run.status(), RunStatus::Failed);
    assert!(run.failed_at().is_some());
    assert_eq!(orchestrator.list_history(None).len(), 1);
    assert!(orchestrator.list_active().is_empty());

    // And: the stored run re-derives the same envelope
    let rederived = PipelineResponse::from_run(&run);
    assert_eq!(rederived.error, response.error);
    assert_eq!(rederived.per_stage_status, response.per_stage_status);
}

/// A request for a kind without a back-end fails at stage 1.
#[tokio::test]
async fn test_e2e_unknown_kind_fails_at_scan() {
    // Given: only code-analysis is configured
    let (orchestrator, _mocks) =
        full_orchestrator(StaticScan::ok(json!({})), StubGenerator::answering());

    // When
    let response = orchestrator
        .execute_pipeline(PipelineRequest::new(ScanKind::BucketScan, json!({})))
        .await;

    // Then
    assert_eq!(response.status, RunStatus::Failed);
    let error = response.error.expect("should have error");
    assert!(error.contains("bucket-scan"), "unexpected error: {error}");
}

/// A panicking scan back-end is recorded as a failed scan, not a crash.
#[tokio::test]
async fn test_e2e_panicking_scan_is_contained() {
    // Given
    let orchestrator = Orchestrator::builder()
        .scan_backend(
            ScanKind::SecretScan,
            Arc::new(PanickingStage(StageName::Scan)),
        )
        .build()
        .expect("should build orchestrator");

    // When
    let response = orchestrator
        .execute_pipeline(PipelineRequest::new(ScanKind::SecretScan, json!({})))
        .await;

    // Then
    assert_eq!(response.status, RunStatus::Failed);
    let error = response.error.expect("should have error");
    assert!(error.contains("converter blew up"), "unexpected error: {error}");
}

//! Failures in stages 2-5 degrade the run without failing it.

use std::sync::Arc;

use serde_json::json;

use vigil_core::stage::StageName;
use vigil_core::types::ScanKind;
use vigil_pipeline::{PipelineRequest, RunStatus, StageState};

use crate::helpers::collaborators::StubGenerator;
use crate::helpers::stages::{FailingStage, PanickingStage, StaticScan};
use crate::helpers::{full_builder, full_orchestrator, three_findings};

/// Enrichment throws: the run still completes, insights are absent and
/// the scan results are passed through unchanged.
#[tokio::test]
async fn test_e2e_enrichment_failure_degrades_run() {
    // Given: a text generator that errors on every call
    let (orchestrator, mocks) =
        full_orchestrator(StaticScan::ok(three_findings()), StubGenerator::failing());

    // When
    let response = orchestrator
        .execute_pipeline(PipelineRequest::new(ScanKind::CodeAnalysis, json!({})))
        .await;

    // Then: completed but degraded
    assert!(response.success);
    assert_eq!(response.status, RunStatus::Completed);
    assert!(!response.can_retry);
    assert!(response.error.is_none());
    assert_eq!(response.degraded_stages, vec![StageName::Enrich]);
    assert_eq!(
        response.per_stage_status[&StageName::Enrich],
        StageState::Failed
    );

    // And: no insights, unchanged scan results, later stages still ran
    assert!(response.enrichment_insights.is_none());
    assert_eq!(response.scan_results, Some(three_findings()));
    assert!(response.conversation.expect("should have conversation").can_chat);
    assert!(response.storage.is_some());
    assert_eq!(
        response.reports.expect("should have reports")["securityMetrics"]["totalFindings"],
        3
    );
    assert_eq!(mocks.generator.calls(), 1);

    // And: the failure cause is on the stored run
    let run = orchestrator
        .get_run(&response.pipeline_id)
        .expect("should find run");
    let enrich = run.stage(StageName::Enrich).expect("should have enrich record");
    assert!(enrich.results.is_none());
    assert!(
        enrich
            .error
            .as_deref()
            .is_some_and(|cause| cause.contains("model crashed"))
    );
    assert!(run.is_degraded());
}

/// Several failing stages are all reported, in stage order.
#[tokio::test]
async fn test_e2e_multiple_degraded_stages() {
    // Given: converse and persist replaced with failing stages
    let (builder, _mocks) = full_builder(StaticScan::ok(three_findings()), StubGenerator::answering());
    let orchestrator = builder
        .stage(Arc::new(FailingStage {
            stage: StageName::Persist,
            cause: "bucket quota exceeded",
        }))
        .stage(Arc::new(FailingStage {
            stage: StageName::Converse,
            cause: "chat service down",
        }))
        .build()
        .expect("should build orchestrator");

    // When
    let response = orchestrator
        .execute_pipeline(PipelineRequest::new(ScanKind::CodeAnalysis, json!({})))
        .await;

    // Then
    assert!(response.success);
    assert_eq!(
        response.degraded_stages,
        vec![StageName::Converse, StageName::Persist]
    );
    let conversation = response.conversation.expect("should have conversation");
    assert!(!conversation.can_chat);
    assert!(conversation.session_id.is_none());
    assert!(response.storage.is_none());
    assert!(response.reports.is_some());
}

/// A panic inside a non-fatal stage is recorded as that stage's failure.
#[tokio::test]
async fn test_e2e_panicking_stage_is_recorded_as_failed() {
    // Given
    let (builder, _mocks) = full_builder(StaticScan::ok(three_findings()), StubGenerator::answering());
    let orchestrator = builder
        .stage(Arc::new(PanickingStage(StageName::Converse)))
        .build()
        .expect("should build orchestrator");

    // When
    let response = orchestrator
        .execute_pipeline(PipelineRequest::new(ScanKind::CodeAnalysis, json!({})))
        .await;

    // Then
    assert_eq!(response.status, RunStatus::Completed);
    assert_eq!(response.degraded_stages, vec![StageName::Converse]);
    let run = orchestrator
        .get_run(&response.pipeline_id)
        .expect("should find run");
    let cause = run
        .stage(StageName::Converse)
        .and_then(|record| record.error.clone())
        .expect("should have a cause");
    assert!(cause.contains("stage panicked"), "unexpected cause: {cause}");
    assert_eq!(
        run.stage_state(StageName::Persist),
        StageState::Completed
    );
}

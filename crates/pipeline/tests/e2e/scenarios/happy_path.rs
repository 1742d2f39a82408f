//! A full run where every stage succeeds.

use serde_json::json;

use vigil_core::stage::StageName;
use vigil_core::types::ScanKind;
use vigil_pipeline::{PipelineRequest, RunStatus, StageState};

use crate::helpers::stages::StaticScan;
use crate::helpers::{full_orchestrator, three_findings};

/// Code analysis with one critical and two medium findings completes
/// and the report counts all three.
#[tokio::test]
async fn test_e2e_code_analysis_with_three_findings() {
    // Given: a scan back-end reporting 1 critical + 2 medium findings
    let (orchestrator, mocks) = full_orchestrator(
        StaticScan::ok(three_findings()),
        crate::helpers::collaborators::StubGenerator::answering(),
    );

    // When: executing a code-analysis pipeline
    let response = orchestrator
        .execute_pipeline(PipelineRequest::new(
            ScanKind::CodeAnalysis,
            json!({"code": "SELECT * FROM users WHERE name = '" }),
        ))
        .await;

    // Then: the run completes with every stage completed
    assert!(response.success);
    assert_eq!(response.status, RunStatus::Completed);
    assert!(!response.can_retry);
    assert!(response.degraded_stages.is_empty());
    assert!(
        response
            .per_stage_status
            .values()
            .all(|state| *state == StageState::Completed)
    );

    // And: the report stage counted all three findings
    let reports = response.reports.expect("should have reports");
    assert_eq!(reports["securityMetrics"]["totalFindings"], 3);
    assert_eq!(reports["securityMetrics"]["bySeverity"]["critical"], 1);
    assert_eq!(reports["securityMetrics"]["bySeverity"]["medium"], 2);

    // And: enrichment, conversation and storage made it into the envelope
    let insights = response.enrichment_insights.expect("should have insights");
    assert_eq!(insights["riskLevel"], "critical");
    assert_eq!(insights["remediationPlan"][0], "Use parameterized queries");
    let conversation = response.conversation.expect("should have conversation");
    assert!(conversation.can_chat);
    assert_eq!(
        conversation.session_id,
        Some(format!("session-{}", response.pipeline_id))
    );
    assert_eq!(response.storage, Some(json!({"storageId": "snapshot-1"})));
    assert_eq!(response.scan_results, Some(three_findings()));

    // And: the snapshot holds the results of the stages before persist
    let snapshot = &mocks.store.snapshots()[0];
    assert_eq!(snapshot["pipelineId"], response.pipeline_id.as_str());
    assert!(snapshot["results"]["enrich"].is_object());
    assert!(snapshot["results"].get("report").is_none());
    assert_eq!(mocks.scan.calls(), 1);
}

/// The finished run lands in history with timings for every stage.
#[tokio::test]
async fn test_e2e_completed_run_is_recorded_in_history() {
    // Given
    let (orchestrator, mocks) = full_orchestrator(
        StaticScan::ok(three_findings()),
        crate::helpers::collaborators::StubGenerator::answering(),
    );

    // When
    let response = orchestrator
        .execute_pipeline(PipelineRequest::new(ScanKind::CodeAnalysis, json!({})))
        .await;

    // Then
    assert_eq!(mocks.registry.active_count(), 0);
    let history = orchestrator.list_history(None);
    assert_eq!(history.len(), 1);
    let run = &history[0];
    assert_eq!(run.id(), response.pipeline_id);
    assert_eq!(run.status(), RunStatus::Completed);
    assert!(run.completed_at().is_some());
    assert_eq!(run.metrics().per_stage_duration_ms.len(), 5);
    assert!(run.metrics().total_duration_ms.is_some());
    assert_eq!(run.total_findings(), Some(3));
    assert!(run.results_of(StageName::Report).is_some());
}

/// Options reach every stage untouched and the input reaches the scan.
#[tokio::test]
async fn test_e2e_request_options_are_kept_on_the_run() {
    // Given
    let (orchestrator, _mocks) = full_orchestrator(
        StaticScan::ok(json!({"findings": []})),
        crate::helpers::collaborators::StubGenerator::answering(),
    );
    let request = PipelineRequest::new(ScanKind::CodeAnalysis, json!({"path": "src/"}))
        .with_options(json!({"depth": 3}));

    // When
    let response = orchestrator.execute_pipeline(request).await;

    // Then
    let run = orchestrator
        .get_run(&response.pipeline_id)
        .expect("should find run");
    assert_eq!(run.input(), &json!({"path": "src/"}));
    assert_eq!(run.options(), &json!({"depth": 3}));
    assert_eq!(
        response.reports.expect("should have reports")["securityMetrics"]["totalFindings"],
        0
    );
}

//! Registry properties observed through the orchestrator.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::task::JoinSet;

use vigil_core::stage::StageName;
use vigil_core::types::ScanKind;
use vigil_pipeline::{Orchestrator, PipelineRequest, RunRegistry, RunStatus, StageState};

use crate::helpers::collaborators::StubGenerator;
use crate::helpers::stages::StaticScan;
use crate::helpers::{full_builder, full_orchestrator};

fn request() -> PipelineRequest {
    PipelineRequest::new(ScanKind::CodeAnalysis, json!({}))
}

/// History keeps the most recent runs first and evicts the oldest.
#[tokio::test]
async fn test_e2e_history_is_bounded_fifo() {
    // Given: a registry holding three runs
    let registry = Arc::new(RunRegistry::new(3));
    let orchestrator = Orchestrator::builder()
        .scan_backend(
            ScanKind::CodeAnalysis,
            Arc::new(StaticScan::ok(json!({"findings": []}))),
        )
        .registry(registry.clone())
        .build()
        .expect("should build orchestrator");

    // When: five runs complete one after another
    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(orchestrator.execute_pipeline(request()).await.pipeline_id);
    }

    // Then: only the last three remain, newest first
    let history: Vec<String> = orchestrator
        .list_history(None)
        .iter()
        .map(|run| run.id().to_owned())
        .collect();
    assert_eq!(history, vec![ids[4].clone(), ids[3].clone(), ids[2].clone()]);
    assert!(orchestrator.get_run(&ids[0]).is_none());
    assert!(orchestrator.get_run(&ids[1]).is_none());
    assert_eq!(orchestrator.list_history(Some(1)).len(), 1);
}

/// While a run is in flight it is active only; afterwards it is history only.
#[tokio::test(start_paused = true)]
async fn test_e2e_run_is_active_xor_history() {
    // Given: a scan that takes 5s
    let (builder, mocks) = full_builder(
        StaticScan::ok(json!({"findings": []})).with_delay(Duration::from_secs(5)),
        StubGenerator::answering(),
    );
    let orchestrator = Arc::new(builder.build().expect("should build orchestrator"));

    // When: the run is started in the background and observed mid-scan
    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.execute_pipeline(request()).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;

    // Then: visible as active with the scan stage running
    let active = orchestrator.list_active();
    assert_eq!(active.len(), 1);
    assert_eq!(mocks.registry.history_len(), 0);
    let in_flight = orchestrator
        .get_run(active[0].id())
        .expect("should find active run");
    assert_eq!(in_flight.status(), RunStatus::Running);
    assert_eq!(in_flight.stage_state(StageName::Scan), StageState::Running);
    assert_eq!(in_flight.stage_state(StageName::Enrich), StageState::Pending);

    // And: once finished it moves to history exactly once
    let response = task.await.expect("should join pipeline task");
    assert!(orchestrator.list_active().is_empty());
    assert_eq!(mocks.registry.history_len(), 1);
    assert_eq!(
        orchestrator
            .get_run(&response.pipeline_id)
            .expect("should find finished run")
            .status(),
        RunStatus::Completed
    );
}

/// Concurrent runs get distinct ids and all land in history.
#[tokio::test]
async fn test_e2e_concurrent_runs_are_independent() {
    // Given
    let (orchestrator, mocks) =
        full_orchestrator(StaticScan::ok(json!({"findings": []})), StubGenerator::answering());
    let orchestrator = Arc::new(orchestrator);

    // When: eight runs execute concurrently
    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let orchestrator = orchestrator.clone();
        tasks.spawn(async move { orchestrator.execute_pipeline(request()).await });
    }
    let mut ids = HashSet::new();
    while let Some(result) = tasks.join_next().await {
        let response = result.expect("should join pipeline task");
        assert!(response.success);
        ids.insert(response.pipeline_id);
    }

    // Then
    assert_eq!(ids.len(), 8);
    assert_eq!(mocks.registry.history_len(), 8);
    assert_eq!(mocks.registry.active_count(), 0);
    assert_eq!(mocks.store.snapshots().len(), 8);
}

//! Timeout watchdog behaviour around real pipeline runs.
//!
//! All tests run on paused time so the watchdog and slow stages advance
//! deterministically.

use std::time::Duration;

use serde_json::json;

use vigil_core::types::ScanKind;
use vigil_pipeline::{PipelineRequest, RunStatus};

use crate::helpers::collaborators::StubGenerator;
use crate::helpers::full_builder;
use crate::helpers::stages::StaticScan;

/// A run slower than the timeout sends exactly one notice and still
/// returns its normal response.
#[tokio::test(start_paused = true)]
async fn test_e2e_slow_run_sends_one_notice() {
    // Given: timeout 1s, scan takes 3s
    let (builder, mocks) = full_builder(
        StaticScan::ok(json!({"findings": []})).with_delay(Duration::from_secs(3)),
        StubGenerator::answering(),
    );
    let orchestrator = builder
        .timeout(Duration::from_secs(1))
        .build()
        .expect("should build orchestrator");

    // When
    let response = orchestrator
        .execute_pipeline(
            PipelineRequest::new(ScanKind::CodeAnalysis, json!({}))
                .with_contact("dev@example.com"),
        )
        .await;

    // Then: one notice to the requested contact
    let notices = mocks.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].contact, "dev@example.com");
    assert_eq!(notices[0].pipeline_id, response.pipeline_id);
    assert_eq!(notices[0].timeout_secs, 1);

    // And: the response itself is unaffected apart from the flag
    assert!(response.success);
    assert_eq!(response.status, RunStatus::Completed);
    assert!(response.timeout_notified);

    // And: nothing more arrives later
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(mocks.notifier.notices().len(), 1);
}

/// A run finishing before the timeout never notifies, even much later.
#[tokio::test(start_paused = true)]
async fn test_e2e_fast_run_never_notifies() {
    // Given
    let (builder, mocks) = full_builder(
        StaticScan::ok(json!({"findings": []})).with_delay(Duration::from_millis(200)),
        StubGenerator::answering(),
    );
    let orchestrator = builder
        .timeout(Duration::from_secs(1))
        .build()
        .expect("should build orchestrator");

    // When
    let response = orchestrator
        .execute_pipeline(
            PipelineRequest::new(ScanKind::CodeAnalysis, json!({}))
                .with_contact("dev@example.com"),
        )
        .await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    // Then
    assert!(!response.timeout_notified);
    assert!(mocks.notifier.notices().is_empty());
}

/// A failed run disarms the watchdog as well.
#[tokio::test(start_paused = true)]
async fn test_e2e_failed_run_never_notifies() {
    // Given
    let (builder, mocks) = full_builder(StaticScan::failing("scanner unavailable"), StubGenerator::answering());
    let orchestrator = builder
        .timeout(Duration::from_secs(1))
        .build()
        .expect("should build orchestrator");

    // When
    let response = orchestrator
        .execute_pipeline(
            PipelineRequest::new(ScanKind::CodeAnalysis, json!({}))
                .with_contact("dev@example.com"),
        )
        .await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    // Then
    assert_eq!(response.status, RunStatus::Failed);
    assert!(mocks.notifier.notices().is_empty());
}

/// Without a contact the timeout is only logged.
#[tokio::test(start_paused = true)]
async fn test_e2e_slow_run_without_contact_only_flags() {
    // Given
    let (builder, mocks) = full_builder(
        StaticScan::ok(json!({"findings": []})).with_delay(Duration::from_secs(3)),
        StubGenerator::answering(),
    );
    let orchestrator = builder
        .timeout(Duration::from_secs(1))
        .build()
        .expect("should build orchestrator");

    // When
    let response = orchestrator
        .execute_pipeline(PipelineRequest::new(ScanKind::CodeAnalysis, json!({})))
        .await;

    // Then
    assert!(response.timeout_notified);
    assert!(mocks.notifier.notices().is_empty());
}

//! Shared E2E test helpers.

pub mod collaborators;
pub mod stages;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use vigil_core::types::ScanKind;
use vigil_pipeline::stages::{ConverseStage, EnrichStage, PersistStage};
use vigil_pipeline::{Orchestrator, OrchestratorBuilder, RunRegistry};

use collaborators::{MemoryStore, RecordingNotifier, StubConversation, StubGenerator};
use stages::StaticScan;

/// Scan payload used by scenario A: one critical and two medium findings.
pub fn three_findings() -> Value {
    json!({
        "findings": [
            {"title": "SQL injection in login", "severity": "critical", "category": "injection"},
            {"title": "MD5 password hashing", "severity": "medium", "category": "crypto"},
            {"title": "Verbose error pages", "severity": "medium", "category": "configuration"}
        ]
    })
}

/// Handles to every mock collaborator wired into [`full_builder`].
#[allow(dead_code)]
pub struct Mocks {
    pub scan: Arc<StaticScan>,
    pub generator: Arc<StubGenerator>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub registry: Arc<RunRegistry>,
}

/// Builder with all five stages configured and a code-analysis scan back-end.
pub fn full_builder(scan: StaticScan, generator: StubGenerator) -> (OrchestratorBuilder, Mocks) {
    let scan = Arc::new(scan);
    let generator = Arc::new(generator);
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let registry = Arc::new(RunRegistry::new(10));

    let builder = Orchestrator::builder()
        .scan_backend(ScanKind::CodeAnalysis, scan.clone())
        .stage(Arc::new(EnrichStage::new(generator.clone())))
        .stage(Arc::new(ConverseStage::new(StubConversation::default())))
        .stage(Arc::new(PersistStage::new(store.clone())))
        .registry(registry.clone())
        .notifier(notifier.clone())
        .timeout(Duration::from_secs(120));

    let mocks = Mocks {
        scan,
        generator,
        store,
        notifier,
        registry,
    };
    (builder, mocks)
}

/// Fully configured orchestrator.
pub fn full_orchestrator(scan: StaticScan, generator: StubGenerator) -> (Orchestrator, Mocks) {
    let (builder, mocks) = full_builder(scan, generator);
    (builder.build().expect("should build orchestrator"), mocks)
}

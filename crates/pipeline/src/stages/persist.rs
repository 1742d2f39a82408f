//! persist stage: 누적 결과 스냅샷 저장

use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;

use vigil_core::error::StageError;
use vigil_core::pipeline::SnapshotStore;
use vigil_core::stage::{StageContext, StageExecutor, StageName};

/// 지금까지의 성공 결과를 저장소에 남기는 stage
///
/// 스냅샷 모양:
/// ```text
/// {"pipelineId", "kind", "storedAt", "results": {"scan": ..., "enrich": ..., ...}}
/// ```
pub struct PersistStage<S> {
    store: S,
}

impl<S: SnapshotStore> PersistStage<S> {
    /// 저장소로 stage를 생성합니다.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: SnapshotStore> StageExecutor for PersistStage<S> {
    fn name(&self) -> &str {
        "snapshot-store"
    }

    fn stage(&self) -> StageName {
        StageName::Persist
    }

    async fn execute(&self, ctx: &StageContext) -> Result<Value, StageError> {
        let snapshot = json!({
            "pipelineId": ctx.run_id,
            "kind": ctx.kind,
            "storedAt": Utc::now(),
            "results": ctx.accumulated_json(),
        });

        let storage_id = self
            .store
            .store(&snapshot)
            .await
            .map_err(|e| StageError::new(StageName::Persist, e.to_string()))?;

        debug!(run_id = %ctx.run_id, storage_id = %storage_id, "snapshot stored");
        Ok(json!({ "storageId": storage_id }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use vigil_core::error::CollaboratorError;
    use vigil_core::types::ScanKind;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<Value>>,
        fail: bool,
    }

    impl SnapshotStore for MemoryStore {
        async fn store(&self, snapshot: &Value) -> Result<String, CollaboratorError> {
            if self.fail {
                return Err(CollaboratorError::Io("disk full".into()));
            }
            let mut saved = self.saved.lock().unwrap();
            saved.push(snapshot.clone());
            Ok(format!("snap-{}", saved.len()))
        }
    }

    fn ctx() -> StageContext {
        let mut ctx = StageContext::new("run-1", ScanKind::DependencyScan, json!({}), json!({}));
        ctx.record(StageName::Scan, json!({"vulnerabilities": []}));
        ctx.record(StageName::Converse, json!({"sessionId": "s"}));
        ctx
    }

    #[tokio::test]
    async fn stores_accumulated_results() {
        let stage = PersistStage::new(MemoryStore::default());

        let result = stage.execute(&ctx()).await.unwrap();

        assert_eq!(result, json!({"storageId": "snap-1"}));
        let saved = stage.store.saved.lock().unwrap();
        assert_eq!(saved[0]["pipelineId"], "run-1");
        assert_eq!(saved[0]["kind"], "dependency-scan");
        assert!(saved[0]["results"]["scan"].is_object());
        assert_eq!(saved[0]["results"]["converse"]["sessionId"], "s");
        assert!(saved[0]["results"].get("enrich").is_none());
    }

    #[tokio::test]
    async fn store_failure_fails_the_stage() {
        let stage = PersistStage::new(MemoryStore {
            fail: true,
            ..Default::default()
        });

        let err = stage.execute(&ctx()).await.unwrap_err();

        assert_eq!(err.stage, StageName::Persist);
        assert!(err.cause.contains("disk full"));
    }
}

//! scan stage: 요청 유형별 back-end 분기

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use vigil_core::error::StageError;
use vigil_core::pipeline::HealthStatus;
use vigil_core::stage::{DynStageExecutor, StageContext, StageExecutor, StageName};
use vigil_core::types::ScanKind;

/// 요청 유형에 맞는 scan back-end를 호출하는 stage
///
/// back-end가 없는 유형의 요청은 실패하며, scan 실패이므로 실행 전체가 중단됩니다.
#[derive(Default, Clone)]
pub struct ScanStage {
    backends: HashMap<ScanKind, Arc<dyn DynStageExecutor>>,
}

impl ScanStage {
    /// back-end 없이 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 유형별 back-end를 등록합니다. 같은 유형은 덮어씁니다.
    pub fn insert(&mut self, kind: ScanKind, backend: Arc<dyn DynStageExecutor>) {
        self.backends.insert(kind, backend);
    }

    /// 등록된 유형 목록 (선언 순서)
    pub fn kinds(&self) -> Vec<ScanKind> {
        ScanKind::ALL
            .into_iter()
            .filter(|kind| self.backends.contains_key(kind))
            .collect()
    }

    /// back-end가 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for ScanStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanStage")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl StageExecutor for ScanStage {
    fn name(&self) -> &str {
        "scan-dispatcher"
    }

    fn stage(&self) -> StageName {
        StageName::Scan
    }

    async fn execute(&self, ctx: &StageContext) -> Result<Value, StageError> {
        let backend = self.backends.get(&ctx.kind).ok_or_else(|| {
            StageError::new(
                StageName::Scan,
                format!("no scan back-end configured for kind '{}'", ctx.kind),
            )
        })?;

        debug!(run_id = %ctx.run_id, kind = %ctx.kind, backend = backend.name(), "dispatching scan");
        backend.execute(ctx).await.map_err(|mut err| {
            err.stage = StageName::Scan;
            err
        })
    }

    async fn health_check(&self) -> HealthStatus {
        if self.backends.is_empty() {
            return HealthStatus::Unhealthy("no scan back-ends configured".to_owned());
        }

        let mut unhealthy = Vec::new();
        for kind in self.kinds() {
            let Some(backend) = self.backends.get(&kind) else {
                continue;
            };
            if !backend.health_check().await.is_healthy() {
                unhealthy.push(kind.as_str());
            }
        }

        if unhealthy.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded(format!("scan back-ends degraded: {}", unhealthy.join(", ")))
        }
    }
}

//! stage 실행기: 파이프라인을 구성하는 개별 작업 단위
//!
//! [`StageExecutor`] trait은 scan, enrich, converse, persist, report 각 단계가
//! 구현하는 확장 포인트입니다. RPITIT를 사용하므로 동적 디스패치가 필요한 곳에서는
//! [`DynStageExecutor`]를 사용합니다. `StageExecutor`를 구현하면 자동으로
//! `DynStageExecutor`도 구현됩니다.
//!
//! # stage 순서
//! ```text
//! scan → enrich → converse → persist → report
//! ```
//! scan 실패만 실행 전체를 중단시킵니다.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StageError;
use crate::pipeline::{BoxFuture, HealthStatus};
use crate::types::ScanKind;

// ─── StageName ───────────────────────────────────────────────────────

/// 파이프라인 stage 이름
///
/// 선언 순서가 곧 실행 순서입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    /// 1단계: kind별 scan back-end 호출
    Scan,
    /// 2단계: 텍스트 생성 기반 위험 평가
    Enrich,
    /// 3단계: 대화 세션 생성
    Converse,
    /// 4단계: 결과 스냅샷 저장
    Persist,
    /// 5단계: 대시보드 집계
    Report,
}

impl StageName {
    /// 실행 순서대로 나열한 전체 stage
    pub const ORDERED: [StageName; 5] = [
        Self::Scan,
        Self::Enrich,
        Self::Converse,
        Self::Persist,
        Self::Report,
    ];

    /// 소문자 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Enrich => "enrich",
            Self::Converse => "converse",
            Self::Persist => "persist",
            Self::Report => "report",
        }
    }

    /// 실패 시 실행 전체를 중단시키는 stage인지 여부
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Scan)
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── StageContext ────────────────────────────────────────────────────

/// stage에 전달되는 실행 컨텍스트
///
/// 요청 원본(`input`, `options`)과 앞선 stage들이 성공적으로 만든 결과를 담습니다.
/// 실패한 stage의 결과는 `accumulated`에 들어가지 않습니다.
#[derive(Debug, Clone)]
pub struct StageContext {
    /// 실행 ID
    pub run_id: String,
    /// 요청 유형
    pub kind: ScanKind,
    /// stage 1에 그대로 전달되는 입력
    pub input: Arc<Value>,
    /// 모든 stage에 전달되는 옵션
    pub options: Arc<Value>,
    /// 앞선 stage의 성공 결과
    pub accumulated: BTreeMap<StageName, Value>,
}

impl StageContext {
    /// 새 컨텍스트를 생성합니다.
    pub fn new(run_id: impl Into<String>, kind: ScanKind, input: Value, options: Value) -> Self {
        Self {
            run_id: run_id.into(),
            kind,
            input: Arc::new(input),
            options: Arc::new(options),
            accumulated: BTreeMap::new(),
        }
    }

    /// 특정 stage의 성공 결과를 조회합니다.
    pub fn result_of(&self, stage: StageName) -> Option<&Value> {
        self.accumulated.get(&stage)
    }

    /// scan 결과를 조회합니다.
    ///
    /// scan이 실패하면 나머지 stage는 실행되지 않으므로, stage 2 이후에서는
    /// 항상 `Some`입니다.
    pub fn scan_results(&self) -> Option<&Value> {
        self.result_of(StageName::Scan)
    }

    /// stage 결과를 누적합니다.
    pub fn record(&mut self, stage: StageName, result: Value) {
        self.accumulated.insert(stage, result);
    }

    /// 누적 결과를 stage 이름을 키로 하는 JSON 객체로 만듭니다.
    pub fn accumulated_json(&self) -> Value {
        let map = self
            .accumulated
            .iter()
            .map(|(stage, value)| (stage.as_str().to_owned(), value.clone()))
            .collect();
        Value::Object(map)
    }
}

// ─── StageExecutor Trait ─────────────────────────────────────────────

/// 모든 stage가 구현하는 실행 trait
///
/// 실행은 재시도해도 안전해야 하지만, 오케스트레이터는 직접 재시도하지 않습니다.
///
/// # 구현 예시
/// ```ignore
/// struct StaticScan;
///
/// impl StageExecutor for StaticScan {
///     fn name(&self) -> &str { "static-scan" }
///     fn stage(&self) -> StageName { StageName::Scan }
///
///     async fn execute(&self, ctx: &StageContext) -> Result<Value, StageError> {
///         Ok(json!({"findings": [], "input": *ctx.input}))
///     }
/// }
/// ```
pub trait StageExecutor: Send + Sync {
    /// 실행기 이름 (로그, 헬스 리포트용)
    fn name(&self) -> &str;

    /// 담당 stage
    fn stage(&self) -> StageName;

    /// stage를 실행합니다.
    fn execute(
        &self,
        ctx: &StageContext,
    ) -> impl Future<Output = Result<Value, StageError>> + Send;

    /// 실행기의 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send {
        async { HealthStatus::Healthy }
    }
}

// ─── DynStageExecutor Trait ──────────────────────────────────────────

/// dyn-compatible stage 실행 trait
///
/// `StageExecutor`는 RPITIT를 사용하므로 `dyn StageExecutor`가 불가합니다.
/// `DynStageExecutor`는 `BoxFuture`를 반환하여 `Arc<dyn DynStageExecutor>`로
/// 실행기를 보관할 수 있게 합니다.
pub trait DynStageExecutor: Send + Sync {
    /// 실행기 이름
    fn name(&self) -> &str;

    /// 담당 stage
    fn stage(&self) -> StageName;

    /// stage를 실행합니다.
    fn execute<'a>(&'a self, ctx: &'a StageContext) -> BoxFuture<'a, Result<Value, StageError>>;

    /// 실행기의 건강 상태를 확인합니다.
    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;
}

/// StageExecutor를 구현한 타입은 자동으로 DynStageExecutor도 구현됩니다.
impl<T: StageExecutor> DynStageExecutor for T {
    fn name(&self) -> &str {
        StageExecutor::name(self)
    }

    fn stage(&self) -> StageName {
        StageExecutor::stage(self)
    }

    fn execute<'a>(&'a self, ctx: &'a StageContext) -> BoxFuture<'a, Result<Value, StageError>> {
        Box::pin(StageExecutor::execute(self, ctx))
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(StageExecutor::health_check(self))
    }
}

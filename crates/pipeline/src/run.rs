//! 실행 상태 모델: 파이프라인 실행 하나와 stage별 상태
//!
//! # 상태 전이
//! ```text
//! stage: Pending → Running → Completed | Failed
//! run:   Running → Completed | Failed
//! ```
//! 모든 전이는 [`PipelineRun`]의 메서드로만 일어나며, 역행하거나 종료된 실행을
//! 건드리는 전이는 [`PipelineEngineError`]로 거부됩니다.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vigil_core::stage::StageName;
use vigil_core::types::{ScanKind, count_findings};

use crate::error::PipelineEngineError;

// ─── RunStatus ───────────────────────────────────────────────────────

/// 실행 전체 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// 실행 중
    Running,
    /// 완료 (일부 stage가 실패했을 수 있음)
    Completed,
    /// scan 실패로 중단
    Failed,
}

impl RunStatus {
    /// 종료 상태인지 여부
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ─── StageState ──────────────────────────────────────────────────────

/// stage 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    /// 아직 시작하지 않음
    Pending,
    /// 실행 중
    Running,
    /// 성공
    Completed,
    /// 실패
    Failed,
}

impl StageState {
    /// 종료 상태인지 여부
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ─── StageStatus ─────────────────────────────────────────────────────

/// stage 하나의 기록
///
/// `results`와 `error`는 상호 배타적입니다. 성공한 stage만 `results`를 가집니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStatus {
    /// 현재 상태
    pub status: StageState,
    /// 성공 결과
    pub results: Option<Value>,
    /// 실패 원인
    pub error: Option<String>,
    /// 시작 시각
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// 종료 시각
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl StageStatus {
    fn pending() -> Self {
        Self {
            status: StageState::Pending,
            results: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// 소요 시간 (밀리초). 끝나지 않은 stage는 `None`.
    pub fn duration_ms(&self) -> Option<u64> {
        let (start, end) = (self.started_at?, self.finished_at?);
        Some(millis_between(start, end))
    }
}

// ─── RunMetrics ──────────────────────────────────────────────────────

/// 실행 타이밍
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    /// 전체 소요 시간 (종료 후에만)
    pub total_duration_ms: Option<u64>,
    /// 끝난 stage별 소요 시간
    pub per_stage_duration_ms: BTreeMap<StageName, u64>,
}

// ─── PipelineRun ─────────────────────────────────────────────────────

/// 파이프라인 실행 하나
///
/// 요청이 들어오면 만들어지고, 실행 중에는 레지스트리의 활성 집합에,
/// 종료 후에는 이력에 보관됩니다. 이력으로 옮겨진 뒤에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    id: String,
    kind: ScanKind,
    input: Value,
    options: Value,
    status: RunStatus,
    stages: BTreeMap<StageName, StageStatus>,
    started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failed_at: Option<DateTime<Utc>>,
    metrics: RunMetrics,
    #[serde(default)]
    timeout_notified: bool,
}

impl PipelineRun {
    /// 새 실행을 생성합니다. 모든 stage는 `Pending`입니다.
    pub fn new(kind: ScanKind, input: Value, options: Value) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), kind, input, options)
    }

    /// 지정한 ID로 새 실행을 생성합니다.
    pub fn with_id(id: impl Into<String>, kind: ScanKind, input: Value, options: Value) -> Self {
        let stages = StageName::ORDERED
            .into_iter()
            .map(|stage| (stage, StageStatus::pending()))
            .collect();

        Self {
            id: id.into(),
            kind,
            input,
            options,
            status: RunStatus::Running,
            stages,
            started_at: Utc::now(),
            completed_at: None,
            failed_at: None,
            metrics: RunMetrics::default(),
            timeout_notified: false,
        }
    }

    // --- 조회 ---

    /// 실행 ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 요청 유형
    pub fn kind(&self) -> ScanKind {
        self.kind
    }

    /// stage 1 입력
    pub fn input(&self) -> &Value {
        &self.input
    }

    /// 요청 옵션
    pub fn options(&self) -> &Value {
        &self.options
    }

    /// 실행 상태
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// 종료 여부
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// stage 기록 전체 (실행 순서)
    pub fn stages(&self) -> &BTreeMap<StageName, StageStatus> {
        &self.stages
    }

    /// stage 기록 하나
    pub fn stage(&self, stage: StageName) -> Option<&StageStatus> {
        self.stages.get(&stage)
    }

    /// stage 상태 (기록이 없으면 `Pending`)
    pub fn stage_state(&self, stage: StageName) -> StageState {
        self.stage(stage)
            .map_or(StageState::Pending, |record| record.status)
    }

    /// 시작 시각
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// 완료 시각
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// 실패 시각
    pub fn failed_at(&self) -> Option<DateTime<Utc>> {
        self.failed_at
    }

    /// 종료 시각 (완료 또는 실패)
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at.or(self.failed_at)
    }

    /// 타이밍
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// watchdog이 이 실행에 대해 발화했는지 여부
    pub fn timeout_notified(&self) -> bool {
        self.timeout_notified
    }

    /// stage별 상태 요약
    pub fn per_stage_status(&self) -> BTreeMap<StageName, StageState> {
        self.stages
            .iter()
            .map(|(stage, record)| (*stage, record.status))
            .collect()
    }

    /// 실패한 후속 stage 목록 (scan 제외)
    pub fn degraded_stages(&self) -> Vec<StageName> {
        self.stages
            .iter()
            .filter(|(stage, record)| !stage.is_fatal() && record.status == StageState::Failed)
            .map(|(stage, _)| *stage)
            .collect()
    }

    /// 일부 후속 stage가 실패한 채 완료되었는지 여부
    pub fn is_degraded(&self) -> bool {
        self.status == RunStatus::Completed && !self.degraded_stages().is_empty()
    }

    /// 성공한 stage의 결과
    pub fn results_of(&self, stage: StageName) -> Option<&Value> {
        self.stage(stage)?.results.as_ref()
    }

    /// scan이 보고한 총 발견 항목 수
    pub fn total_findings(&self) -> Option<usize> {
        self.results_of(StageName::Scan).map(count_findings)
    }

    /// 실행이 끝났거나 현재까지의 경과 시간 (밀리초)
    pub fn elapsed_ms(&self) -> u64 {
        self.metrics
            .total_duration_ms
            .unwrap_or_else(|| millis_between(self.started_at, Utc::now()))
    }

    // --- 전이 ---

    /// stage를 시작합니다 (`Pending → Running`).
    ///
    /// 앞선 stage가 모두 끝나 있어야 합니다.
    pub fn begin_stage(&mut self, stage: StageName) -> Result<(), PipelineEngineError> {
        self.ensure_running()?;

        if let Some((blocking, record)) = self
            .stages
            .range(..stage)
            .find(|(_, record)| !record.status.is_terminal())
        {
            return Err(PipelineEngineError::StageOutOfOrder {
                stage,
                blocking: *blocking,
                state: record.status,
            });
        }

        let record = self.stage_mut(stage);
        if record.status != StageState::Pending {
            return Err(PipelineEngineError::StageTransition {
                stage,
                from: record.status,
                to: StageState::Running,
            });
        }
        record.status = StageState::Running;
        record.started_at = Some(Utc::now());
        Ok(())
    }

    /// stage를 성공으로 마칩니다 (`Running → Completed`).
    pub fn complete_stage(
        &mut self,
        stage: StageName,
        results: Value,
    ) -> Result<(), PipelineEngineError> {
        self.finish_stage(stage, StageState::Completed, Some(results), None)
    }

    /// stage를 실패로 마칩니다 (`Running → Failed`).
    pub fn fail_stage(
        &mut self,
        stage: StageName,
        cause: impl Into<String>,
    ) -> Result<(), PipelineEngineError> {
        self.finish_stage(stage, StageState::Failed, None, Some(cause.into()))
    }

    /// 실행을 완료로 마칩니다.
    pub fn complete(&mut self) -> Result<(), PipelineEngineError> {
        self.finish(RunStatus::Completed)
    }

    /// 실행을 실패로 마칩니다.
    pub fn fail(&mut self) -> Result<(), PipelineEngineError> {
        self.finish(RunStatus::Failed)
    }

    /// watchdog 발화 여부를 기록합니다.
    ///
    /// 발화는 되돌릴 수 없으므로 `true`로만 바뀝니다.
    pub fn mark_timeout_notified(&mut self) {
        self.timeout_notified = true;
    }

    fn finish_stage(
        &mut self,
        stage: StageName,
        to: StageState,
        results: Option<Value>,
        error: Option<String>,
    ) -> Result<(), PipelineEngineError> {
        self.ensure_running()?;

        let record = self.stage_mut(stage);
        if record.status != StageState::Running {
            return Err(PipelineEngineError::StageTransition {
                stage,
                from: record.status,
                to,
            });
        }
        let now = Utc::now();
        record.status = to;
        record.results = results;
        record.error = error;
        record.finished_at = Some(now);

        let duration = record.duration_ms().unwrap_or_default();
        self.metrics.per_stage_duration_ms.insert(stage, duration);
        Ok(())
    }

    fn finish(&mut self, to: RunStatus) -> Result<(), PipelineEngineError> {
        self.ensure_running()?;

        if let Some((stage, _)) = self
            .stages
            .iter()
            .find(|(_, record)| record.status == StageState::Running)
        {
            return Err(PipelineEngineError::StageStillRunning { stage: *stage });
        }

        let now = Utc::now();
        match to {
            RunStatus::Completed => self.completed_at = Some(now),
            RunStatus::Failed => self.failed_at = Some(now),
            RunStatus::Running => {}
        }
        self.status = to;
        self.metrics.total_duration_ms = Some(millis_between(self.started_at, now));
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), PipelineEngineError> {
        if self.status.is_terminal() {
            return Err(PipelineEngineError::RunFinished {
                run_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    fn stage_mut(&mut self, stage: StageName) -> &mut StageStatus {
        self.stages.entry(stage).or_insert_with(StageStatus::pending)
    }
}

fn millis_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from((end - start).num_milliseconds()).unwrap_or(0)
}

//! 오케스트레이터: stage 순차 실행, timeout 알림, 응답 생성, 실행 이력
//!
//! # 실행 흐름
//! ```text
//! request ─> PipelineRun 생성 ─> registry.register ─> watchdog arm
//!        ─> scan ─> enrich ─> converse ─> persist ─> report
//!        ─> watchdog disarm ─> complete/fail ─> registry.retire ─> PipelineResponse
//! ```
//! scan이 실패하면 나머지 stage는 `pending`으로 남은 채 실행이 실패합니다.
//! 나머지 stage의 실패는 기록만 하고 계속 진행합니다 (degraded).
//!
//! 각 stage는 별도 task에서 실행되므로 stage 안의 panic은 해당 stage의
//! 실패로 기록됩니다. 오케스트레이터는 stage를 재시도하지 않습니다.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use vigil_core::error::StageError;
use vigil_core::metrics as m;
use vigil_core::pipeline::{DynNotifier, HealthStatus};
use vigil_core::stage::{DynStageExecutor, StageContext, StageName};
use vigil_core::types::ScanKind;

use crate::error::PipelineEngineError;
use crate::registry::RunRegistry;
use crate::response::PipelineResponse;
use crate::run::{PipelineRun, RunStatus, StageState};
use crate::stages::{ReportStage, ScanStage};
use crate::watchdog::{DEFAULT_TIMEOUT, TimeoutPolicy};

// ─── PipelineRequest ─────────────────────────────────────────────────

/// 파이프라인 실행 요청
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    /// 요청 유형
    pub kind: ScanKind,
    /// scan back-end에 그대로 전달되는 입력
    #[serde(default)]
    pub input: Value,
    /// 모든 stage에 전달되는 옵션
    #[serde(default)]
    pub options: Value,
    /// timeout 알림 수신자
    #[serde(
        default,
        alias = "contact",
        alias = "userContactForTimeoutNotice",
        skip_serializing_if = "Option::is_none"
    )]
    pub notify_contact: Option<String>,
}

impl PipelineRequest {
    /// 옵션과 연락처 없이 요청을 만듭니다.
    pub fn new(kind: ScanKind, input: Value) -> Self {
        Self {
            kind,
            input,
            options: Value::Null,
            notify_contact: None,
        }
    }

    /// 옵션을 지정합니다.
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    /// timeout 알림 수신자를 지정합니다.
    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.notify_contact = Some(contact.into());
        self
    }
}

// ─── StageHealth ─────────────────────────────────────────────────────

/// stage별 건강 상태
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageHealth {
    /// 실행기 이름 (없으면 `"unconfigured"`)
    pub name: String,
    /// stage
    pub stage: StageName,
    /// 상태
    pub status: HealthStatus,
}

// ─── Orchestrator ────────────────────────────────────────────────────

/// 보안 파이프라인 오케스트레이터
///
/// 여러 task에서 동시에 `execute_pipeline`을 호출할 수 있습니다.
/// 실행 간에 공유되는 상태는 레지스트리뿐입니다.
///
/// # 사용 예시
/// ```ignore
/// let orchestrator = Orchestrator::builder()
///     .scan_backend(ScanKind::CodeAnalysis, Arc::new(code_scanner))
///     .stage(Arc::new(EnrichStage::new(generator)))
///     .timeout(Duration::from_secs(120))
///     .build()?;
///
/// let response = orchestrator
///     .execute_pipeline(PipelineRequest::new(ScanKind::CodeAnalysis, input))
///     .await;
/// ```
pub struct Orchestrator {
    stages: BTreeMap<StageName, Arc<dyn DynStageExecutor>>,
    registry: Arc<RunRegistry>,
    timeout: TimeoutPolicy,
}

impl Orchestrator {
    /// 빌더를 생성합니다.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// 파이프라인을 끝까지 실행하고 응답을 반환합니다.
    ///
    /// stage 실패는 응답에 기록될 뿐 에러로 반환되지 않습니다.
    pub async fn execute_pipeline(&self, request: PipelineRequest) -> PipelineResponse {
        let PipelineRequest {
            kind,
            input,
            options,
            notify_contact,
        } = request;

        let mut run = PipelineRun::new(kind, input, options);
        let run_id = run.id().to_owned();
        let started = Instant::now();

        if let Err(e) = self.registry.register(run.clone()) {
            error!(run_id = %run_id, error = %e, "failed to register run");
        }
        counter!(m::PIPELINE_RUNS_STARTED_TOTAL, m::LABEL_KIND => kind.as_str()).increment(1);
        info!(run_id = %run_id, kind = %kind, "pipeline run started");

        let watchdog = self.timeout.arm(&run_id, kind, notify_contact);

        let mut ctx = StageContext::new(
            run_id.clone(),
            kind,
            run.input().clone(),
            run.options().clone(),
        );

        for stage in StageName::ORDERED {
            if let Err(e) = run.begin_stage(stage) {
                error!(run_id = %run_id, stage = %stage, error = %e, "stage could not start");
                break;
            }
            self.sync(&run);

            let stage_started = Instant::now();
            let outcome = self.run_stage(stage, &ctx).await;
            histogram!(m::STAGE_DURATION_SECONDS, m::LABEL_STAGE => stage.as_str())
                .record(stage_started.elapsed().as_secs_f64());

            let fatal = match outcome {
                Ok(results) => {
                    debug!(run_id = %run_id, stage = %stage, "stage completed");
                    ctx.record(stage, results.clone());
                    record_transition(run.complete_stage(stage, results), &run_id);
                    false
                }
                Err(err) => {
                    counter!(m::STAGE_FAILURES_TOTAL, m::LABEL_STAGE => stage.as_str())
                        .increment(1);
                    if stage.is_fatal() {
                        warn!(run_id = %run_id, stage = %stage, error = %err.cause, "fatal stage failed, aborting run");
                    } else {
                        warn!(run_id = %run_id, stage = %stage, error = %err.cause, "stage failed, continuing degraded");
                    }
                    record_transition(run.fail_stage(stage, err.cause), &run_id);
                    stage.is_fatal()
                }
            };
            self.sync(&run);

            if fatal {
                break;
            }
        }

        watchdog.disarm();
        if watchdog.has_fired() {
            run.mark_timeout_notified();
        }

        let scan_failed = run
            .stage(StageName::Scan)
            .is_none_or(|record| record.status != StageState::Completed);
        let finished = if scan_failed { run.fail() } else { run.complete() };
        record_transition(finished, &run_id);

        if let Err(e) = self.registry.retire(run.clone()) {
            error!(run_id = %run_id, error = %e, "failed to move run to history");
        }

        record_run_metrics(&run, started.elapsed());
        let response = PipelineResponse::from_run(&run);
        info!(
            run_id = %run_id,
            kind = %kind,
            status = %run.status(),
            degraded = ?run.degraded_stages(),
            duration_ms = response.execution_time_ms,
            "pipeline run finished"
        );
        response
    }

    /// ID로 실행을 조회합니다 (진행 중 또는 이력).
    pub fn get_run(&self, id: &str) -> Option<PipelineRun> {
        self.registry.get_by_id(id)
    }

    /// 최근 순으로 이력을 반환합니다.
    pub fn list_history(&self, limit: Option<usize>) -> Vec<PipelineRun> {
        self.registry.list_history(limit)
    }

    /// 진행 중인 실행을 반환합니다.
    pub fn list_active(&self) -> Vec<PipelineRun> {
        self.registry.list_active()
    }

    /// 공유 레지스트리
    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    /// timeout 정책
    pub fn timeout(&self) -> Duration {
        self.timeout.timeout()
    }

    /// 구성된 stage 실행기 수
    pub fn configured_stages(&self) -> usize {
        self.stages.len()
    }

    /// stage별 건강 상태를 확인합니다.
    ///
    /// 구성되지 않은 stage는 `Degraded`로 보고합니다.
    pub async fn stage_health(&self) -> Vec<StageHealth> {
        let mut report = Vec::with_capacity(StageName::ORDERED.len());
        for stage in StageName::ORDERED {
            let entry = match self.stages.get(&stage) {
                Some(executor) => StageHealth {
                    name: executor.name().to_owned(),
                    stage,
                    status: executor.health_check().await,
                },
                None => StageHealth {
                    name: "unconfigured".to_owned(),
                    stage,
                    status: HealthStatus::Degraded(format!("{stage} stage not configured")),
                },
            };
            report.push(entry);
        }
        report
    }

    /// stage 하나를 별도 task에서 실행합니다.
    async fn run_stage(&self, stage: StageName, ctx: &StageContext) -> Result<Value, StageError> {
        let Some(executor) = self.stages.get(&stage).cloned() else {
            return Err(StageError::new(stage, format!("{stage} stage not configured")));
        };

        let ctx = ctx.clone();
        let handle = tokio::spawn(async move { executor.execute(&ctx).await });

        match handle.await {
            Ok(result) => result.map_err(|mut err| {
                err.stage = stage;
                err
            }),
            Err(join_err) => Err(StageError::new(stage, panic_message(join_err))),
        }
    }

    fn sync(&self, run: &PipelineRun) {
        if let Err(e) = self.registry.update(run) {
            debug!(run_id = run.id(), error = %e, "registry snapshot not updated");
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stages", &self.stages.keys().collect::<Vec<_>>())
            .field("registry", &self.registry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn record_transition(result: Result<(), PipelineEngineError>, run_id: &str) {
    if let Err(e) = result {
        error!(run_id = %run_id, error = %e, "illegal run transition");
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "stage task was cancelled".to_owned();
    }
    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned());
    format!("stage panicked: {detail}")
}

#[allow(clippy::cast_precision_loss)]
fn record_run_metrics(run: &PipelineRun, elapsed: Duration) {
    let kind = run.kind().as_str();
    histogram!(m::PIPELINE_RUN_DURATION_SECONDS, m::LABEL_KIND => kind)
        .record(elapsed.as_secs_f64());

    match run.status() {
        RunStatus::Completed => {
            counter!(m::PIPELINE_RUNS_COMPLETED_TOTAL, m::LABEL_KIND => kind).increment(1);
            if run.is_degraded() {
                counter!(m::PIPELINE_RUNS_DEGRADED_TOTAL, m::LABEL_KIND => kind).increment(1);
            }
        }
        RunStatus::Failed => {
            counter!(m::PIPELINE_RUNS_FAILED_TOTAL, m::LABEL_KIND => kind).increment(1);
        }
        RunStatus::Running => {}
    }

    if let Some(total) = run.total_findings() {
        counter!(m::PIPELINE_FINDINGS_TOTAL, m::LABEL_KIND => kind).increment(total as u64);
    }
}

// ─── OrchestratorBuilder ─────────────────────────────────────────────

/// 오케스트레이터 빌더
///
/// report stage는 기본으로 등록됩니다. 다른 stage는 등록하지 않으면
/// 실행 시 `not configured`로 실패(degraded) 처리됩니다.
pub struct OrchestratorBuilder {
    scan: ScanStage,
    stages: BTreeMap<StageName, Arc<dyn DynStageExecutor>>,
    registry: Option<Arc<RunRegistry>>,
    timeout: Duration,
    notifier: Option<Arc<dyn DynNotifier>>,
    notify_on_timeout: bool,
    errors: Vec<PipelineEngineError>,
}

impl OrchestratorBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        let mut stages: BTreeMap<StageName, Arc<dyn DynStageExecutor>> = BTreeMap::new();
        stages.insert(StageName::Report, Arc::new(ReportStage::new()));
        Self {
            scan: ScanStage::new(),
            stages,
            registry: None,
            timeout: DEFAULT_TIMEOUT,
            notifier: None,
            notify_on_timeout: true,
            errors: Vec::new(),
        }
    }

    /// 요청 유형별 scan back-end를 등록합니다.
    pub fn scan_backend(mut self, kind: ScanKind, backend: Arc<dyn DynStageExecutor>) -> Self {
        self.scan.insert(kind, backend);
        self
    }

    /// stage 2~5 실행기를 등록합니다. 같은 stage는 덮어씁니다.
    ///
    /// scan 실행기는 [`scan_backend`](Self::scan_backend)로 등록해야 합니다.
    pub fn stage(mut self, executor: Arc<dyn DynStageExecutor>) -> Self {
        let stage = executor.stage();
        if stage == StageName::Scan {
            self.errors.push(PipelineEngineError::Config {
                field: "stages.scan".to_owned(),
                reason: format!(
                    "'{}' must be registered with scan_backend for a specific kind",
                    executor.name()
                ),
            });
        } else {
            self.stages.insert(stage, executor);
        }
        self
    }

    /// 공유 레지스트리를 지정합니다. 지정하지 않으면 기본 용량으로 생성합니다.
    pub fn registry(mut self, registry: Arc<RunRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// timeout을 지정합니다.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// timeout 알림 서비스를 지정합니다.
    pub fn notifier(mut self, notifier: Arc<dyn DynNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// timeout 시 연락처로 알림을 보낼지 지정합니다.
    pub fn notify_on_timeout(mut self, notify: bool) -> Self {
        self.notify_on_timeout = notify;
        self
    }

    /// 오케스트레이터를 빌드합니다.
    pub fn build(self) -> Result<Orchestrator, PipelineEngineError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }
        if self.timeout.is_zero() {
            return Err(PipelineEngineError::Config {
                field: "pipeline.timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let mut stages = self.stages;
        if self.scan.is_empty() {
            warn!("no scan back-ends configured, every run will fail at the scan stage");
        }
        stages.insert(StageName::Scan, Arc::new(self.scan));

        let mut timeout = TimeoutPolicy::new(self.timeout).notify_contacts(self.notify_on_timeout);
        if let Some(notifier) = self.notifier {
            timeout = timeout.with_notifier(notifier);
        }

        let orchestrator = Orchestrator {
            stages,
            registry: self.registry.unwrap_or_default(),
            timeout,
        };
        debug!(?orchestrator, "orchestrator built");
        Ok(orchestrator)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

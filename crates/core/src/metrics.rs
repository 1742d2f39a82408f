//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `vigil_`
//! - 영역: `pipeline_`, `stage_`, `registry_`, `watchdog_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(vigil_core::metrics::PIPELINE_RUNS_STARTED_TOTAL, "kind" => "code-analysis")
//!     .increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 요청 유형 레이블 키 (code-analysis, repository-scan, ...)
pub const LABEL_KIND: &str = "kind";

/// stage 레이블 키 (scan, enrich, converse, persist, report)
pub const LABEL_STAGE: &str = "stage";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Pipeline 메트릭 ───────────────────────────────────────────────

/// Pipeline: 시작된 실행 수 (counter, label: kind)
pub const PIPELINE_RUNS_STARTED_TOTAL: &str = "vigil_pipeline_runs_started_total";

/// Pipeline: 완료된 실행 수 (counter, label: kind)
pub const PIPELINE_RUNS_COMPLETED_TOTAL: &str = "vigil_pipeline_runs_completed_total";

/// Pipeline: 실패한 실행 수 (counter, label: kind)
pub const PIPELINE_RUNS_FAILED_TOTAL: &str = "vigil_pipeline_runs_failed_total";

/// Pipeline: 일부 stage가 실패한 채 완료된 실행 수 (counter, label: kind)
pub const PIPELINE_RUNS_DEGRADED_TOTAL: &str = "vigil_pipeline_runs_degraded_total";

/// Pipeline: 실행 전체 소요 시간 (histogram, 초, label: kind)
pub const PIPELINE_RUN_DURATION_SECONDS: &str = "vigil_pipeline_run_duration_seconds";

/// Pipeline: scan이 보고한 발견 항목 수 (counter, label: kind)
pub const PIPELINE_FINDINGS_TOTAL: &str = "vigil_pipeline_findings_total";

// ─── Stage 메트릭 ──────────────────────────────────────────────────

/// Stage: stage 실행 소요 시간 (histogram, 초, labels: stage, result)
pub const STAGE_DURATION_SECONDS: &str = "vigil_stage_duration_seconds";

/// Stage: 실패한 stage 수 (counter, label: stage)
pub const STAGE_FAILURES_TOTAL: &str = "vigil_stage_failures_total";

// ─── Registry 메트릭 ───────────────────────────────────────────────

/// Registry: 실행 중인 run 수 (gauge)
pub const REGISTRY_ACTIVE_RUNS: &str = "vigil_registry_active_runs";

/// Registry: 이력에 보관된 run 수 (gauge)
pub const REGISTRY_HISTORY_SIZE: &str = "vigil_registry_history_size";

/// Registry: 용량 초과로 밀려난 이력 수 (counter)
pub const REGISTRY_HISTORY_EVICTIONS_TOTAL: &str = "vigil_registry_history_evictions_total";

// ─── Watchdog 메트릭 ───────────────────────────────────────────────

/// Watchdog: 발화한 timeout 수 (counter)
pub const WATCHDOG_TIMEOUTS_TOTAL: &str = "vigil_watchdog_timeouts_total";

/// Watchdog: 알림 전송 시도 수 (counter, label: result)
pub const WATCHDOG_NOTIFICATIONS_TOTAL: &str = "vigil_watchdog_notifications_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "vigil_daemon_uptime_seconds";

/// Daemon: 구성된 stage 실행기 수 (gauge)
pub const DAEMON_STAGE_EXECUTORS_CONFIGURED: &str = "vigil_daemon_stage_executors_configured";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "vigil_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// stage/실행 소요 시간 히스토그램 버킷 (초)
///
/// 10ms ~ 600s 범위 (scan back-end와 텍스트 생성 호출 포함)
pub const RUN_DURATION_BUCKETS: [f64; 11] = [
    0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 600.0,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `vigil-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Pipeline
    describe_counter!(
        PIPELINE_RUNS_STARTED_TOTAL,
        "Total number of pipeline runs started"
    );
    describe_counter!(
        PIPELINE_RUNS_COMPLETED_TOTAL,
        "Total number of pipeline runs that reached the completed state"
    );
    describe_counter!(
        PIPELINE_RUNS_FAILED_TOTAL,
        "Total number of pipeline runs aborted by a scan failure"
    );
    describe_counter!(
        PIPELINE_RUNS_DEGRADED_TOTAL,
        "Total number of completed runs with at least one failed downstream stage"
    );
    describe_histogram!(
        PIPELINE_RUN_DURATION_SECONDS,
        "End-to-end pipeline run duration in seconds"
    );
    describe_counter!(
        PIPELINE_FINDINGS_TOTAL,
        "Total number of findings reported by scan back-ends"
    );

    // Stage
    describe_histogram!(
        STAGE_DURATION_SECONDS,
        "Duration of a single stage execution in seconds"
    );
    describe_counter!(STAGE_FAILURES_TOTAL, "Total number of failed stage executions");

    // Registry
    describe_gauge!(REGISTRY_ACTIVE_RUNS, "Number of pipeline runs in progress");
    describe_gauge!(
        REGISTRY_HISTORY_SIZE,
        "Number of finished pipeline runs kept in history"
    );
    describe_counter!(
        REGISTRY_HISTORY_EVICTIONS_TOTAL,
        "Total number of history entries evicted by the capacity limit"
    );

    // Watchdog
    describe_counter!(
        WATCHDOG_TIMEOUTS_TOTAL,
        "Total number of runs that exceeded the notification timeout"
    );
    describe_counter!(
        WATCHDOG_NOTIFICATIONS_TOTAL,
        "Timeout notification attempts by result"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Vigil daemon uptime in seconds");
    describe_gauge!(
        DAEMON_STAGE_EXECUTORS_CONFIGURED,
        "Number of stage executors wired into the orchestrator"
    );
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}

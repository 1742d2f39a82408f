//! Aggregated health reporting.
//!
//! Combines the per-stage health of the orchestrator with registry
//! occupancy into a single [`DaemonHealth`] report.
//!
//! # Aggregation Rule
//!
//! - Scan stage unhealthy -> Unhealthy (every run would fail)
//! - Any other stage not healthy -> Degraded(reason)
//! - Otherwise -> Healthy

use serde::Serialize;

use vigil_core::pipeline::HealthStatus;
use vigil_core::stage::StageName;
use vigil_pipeline::{Orchestrator, StageHealth};

/// Aggregated health report for the daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Overall status (worst relevant stage).
    pub status: HealthStatus,
    /// Seconds since the daemon started.
    pub uptime_secs: u64,
    /// Runs currently executing.
    pub active_runs: usize,
    /// Finished runs retained in history.
    pub history_size: usize,
    /// Per-stage reports in execution order.
    pub stages: Vec<StageHealth>,
}

impl DaemonHealth {
    /// Collect a report from a live orchestrator.
    pub async fn collect(orchestrator: &Orchestrator, uptime_secs: u64) -> Self {
        let stages = orchestrator.stage_health().await;
        let registry = orchestrator.registry();
        Self {
            status: aggregate_status(&stages),
            uptime_secs,
            active_runs: registry.active_count(),
            history_size: registry.history_len(),
            stages,
        }
    }
}

/// Fold stage reports into one status.
///
/// Only the scan stage can make the daemon unhealthy; stages 2-5 are
/// best-effort, so their failures degrade it at most.
pub fn aggregate_status(stages: &[StageHealth]) -> HealthStatus {
    let mut unhealthy = Vec::new();
    let mut degraded = Vec::new();

    for entry in stages {
        let reason = match &entry.status {
            HealthStatus::Healthy => continue,
            HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => {
                format!("{}: {}", entry.stage, reason)
            }
        };
        if entry.stage == StageName::Scan && entry.status.is_unhealthy() {
            unhealthy.push(reason);
        } else {
            degraded.push(reason);
        }
    }

    if !unhealthy.is_empty() {
        unhealthy.extend(degraded);
        HealthStatus::Unhealthy(unhealthy.join("; "))
    } else if !degraded.is_empty() {
        HealthStatus::Degraded(degraded.join("; "))
    } else {
        HealthStatus::Healthy
    }
}

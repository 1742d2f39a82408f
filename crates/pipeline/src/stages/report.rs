//! report stage: 대시보드용 로컬 집계

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::{Value, json};

use vigil_core::error::StageError;
use vigil_core::stage::{StageContext, StageExecutor, StageName};
use vigil_core::types::{ScanReport, Severity, count_findings};

/// 위험 점수 상한
const MAX_RISK_SCORE: u32 = 100;

/// scan 결과를 집계하는 stage
///
/// 외부 호출이 없으므로 오케스트레이터가 기본으로 등록합니다.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportStage;

impl ReportStage {
    /// stage를 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

impl StageExecutor for ReportStage {
    fn name(&self) -> &str {
        "local-report"
    }

    fn stage(&self) -> StageName {
        StageName::Report
    }

    async fn execute(&self, ctx: &StageContext) -> Result<Value, StageError> {
        let scan = ctx
            .scan_results()
            .ok_or_else(|| StageError::new(StageName::Report, "scan results missing"))?;
        Ok(aggregate(scan))
    }
}

/// scan 결과에서 보안 지표를 계산합니다.
///
/// ```text
/// {
///   "securityMetrics": {
///     "totalFindings", "bySeverity", "byCategory", "riskScore", "maxSeverity"
///   },
///   "trend": {"available": false, ...},
///   "generatedAt"
/// }
/// ```
/// `riskScore`는 심각도 가중치 합을 100으로 자른 값입니다.
pub fn aggregate(scan: &Value) -> Value {
    let report = ScanReport::from_value(scan);

    let by_severity: BTreeMap<&str, usize> = Severity::ALL
        .iter()
        .map(|severity| (severity.as_str(), report.count_by_severity(*severity)))
        .collect();

    let mut by_category: BTreeMap<&str, usize> = BTreeMap::new();
    for finding in &report.findings {
        *by_category.entry(finding.category.as_str()).or_default() += 1;
    }

    let risk_score = report
        .findings
        .iter()
        .map(|f| f.severity.weight())
        .sum::<u32>()
        .min(MAX_RISK_SCORE);

    json!({
        "securityMetrics": {
            "totalFindings": count_findings(scan),
            "bySeverity": by_severity,
            "byCategory": by_category,
            "riskScore": risk_score,
            "maxSeverity": report.max_severity(),
        },
        "trend": {
            "available": false,
            "reason": "no previous run to compare against",
        },
        "generatedAt": Utc::now(),
    })
}

//! enrich stage: 텍스트 생성 기반 위험 평가

use serde_json::Value;
use tracing::debug;

use vigil_core::error::StageError;
use vigil_core::pipeline::TextGenerator;
use vigil_core::stage::{StageContext, StageExecutor, StageName};
use vigil_core::types::ScanReport;

use crate::insights;

/// 프롬프트에 넣는 기본 최대 발견 항목 수
pub const DEFAULT_MAX_FINDINGS: usize = 25;

/// scan 결과를 텍스트 생성 서비스에 보내 위험 평가를 얻는 stage
///
/// 응답 해석은 best-effort입니다. 서비스 호출이 실패할 때만 stage가 실패합니다.
pub struct EnrichStage<G> {
    generator: G,
    max_findings: usize,
}

impl<G: TextGenerator> EnrichStage<G> {
    /// 텍스트 생성 서비스로 stage를 생성합니다.
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            max_findings: DEFAULT_MAX_FINDINGS,
        }
    }

    /// 프롬프트에 넣을 최대 발견 항목 수를 지정합니다 (최소 1).
    pub fn max_findings(mut self, max: usize) -> Self {
        self.max_findings = max.max(1);
        self
    }
}

impl<G: TextGenerator> StageExecutor for EnrichStage<G> {
    fn name(&self) -> &str {
        "text-generation-enrichment"
    }

    fn stage(&self) -> StageName {
        StageName::Enrich
    }

    async fn execute(&self, ctx: &StageContext) -> Result<Value, StageError> {
        let scan = ctx
            .scan_results()
            .ok_or_else(|| StageError::new(StageName::Enrich, "scan results missing"))?;
        let report = ScanReport::from_value(scan);
        let prompt = insights::build_prompt(ctx.kind, &report, self.max_findings);

        debug!(
            run_id = %ctx.run_id,
            findings = report.len(),
            prompt_len = prompt.len(),
            "requesting enrichment"
        );
        let text = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| StageError::new(StageName::Enrich, e.to_string()))?;

        let extracted = insights::extract(&text);
        if !extracted.extracted {
            debug!(run_id = %ctx.run_id, "risk level not found in response, using fallback");
        }
        serde_json::to_value(extracted).map_err(|e| StageError::new(StageName::Enrich, e.to_string()))
    }
}

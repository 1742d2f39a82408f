//! 응답 envelope: 종료된 실행에서 호출자에게 돌려줄 통합 응답을 만듭니다.
//!
//! [`PipelineResponse::from_run`]은 실행 기록만으로 결정되는 순수 함수입니다.
//! 이력에 보관된 실행에서 다시 만들어도 같은 응답이 나옵니다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vigil_core::stage::StageName;
use vigil_core::types::ScanKind;

use crate::run::{PipelineRun, RunStatus, StageState};

/// 대화 세션 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEnvelope {
    /// 대화 가능 여부
    pub can_chat: bool,
    /// 세션 핸들
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// 제안 후속 질문
    #[serde(default)]
    pub suggested_prompts: Vec<String>,
}

impl ConversationEnvelope {
    /// 세션이 없을 때의 기본값
    pub fn unavailable() -> Self {
        Self {
            can_chat: false,
            session_id: None,
            suggested_prompts: Vec::new(),
        }
    }

    fn from_stage_results(results: &Value) -> Self {
        let session_id = results
            .get("sessionId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        let suggested_prompts = results
            .get("suggestedPrompts")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            can_chat: session_id.is_some(),
            session_id,
            suggested_prompts,
        }
    }
}

/// 파이프라인 실행 응답
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    /// 실행이 완료되었는지 여부 (degraded 포함)
    pub success: bool,
    /// 실행 ID
    pub pipeline_id: String,
    /// 요청 유형
    pub kind: ScanKind,
    /// 실행 상태
    pub status: RunStatus,
    /// 전체 소요 시간 (밀리초)
    pub execution_time_ms: u64,
    /// scan 결과 (실패 시 `null`)
    pub scan_results: Option<Value>,
    /// enrich 결과
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_insights: Option<Value>,
    /// 대화 세션
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationEnvelope>,
    /// 저장 결과
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Value>,
    /// 대시보드 집계
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports: Option<Value>,
    /// stage별 상태
    pub per_stage_status: BTreeMap<StageName, StageState>,
    /// 실패한 후속 stage
    #[serde(default)]
    pub degraded_stages: Vec<StageName>,
    /// 실패 원인 (실패한 실행만)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 같은 요청을 다시 보낼 가치가 있는지 여부
    pub can_retry: bool,
    /// timeout 알림이 발생했는지 여부
    #[serde(default)]
    pub timeout_notified: bool,
}

impl PipelineResponse {
    /// 실행 기록에서 응답을 만듭니다.
    pub fn from_run(run: &PipelineRun) -> Self {
        let status = run.status();
        let failed = status == RunStatus::Failed;
        let completed = status == RunStatus::Completed;

        let error = if failed {
            run.stages()
                .values()
                .find_map(|record| record.error.clone())
                .or_else(|| Some("pipeline failed".to_owned()))
        } else {
            None
        };

        let conversation = if completed {
            Some(
                run.results_of(StageName::Converse)
                    .map(ConversationEnvelope::from_stage_results)
                    .unwrap_or_else(ConversationEnvelope::unavailable),
            )
        } else {
            None
        };

        Self {
            success: completed,
            pipeline_id: run.id().to_owned(),
            kind: run.kind(),
            status,
            execution_time_ms: run.elapsed_ms(),
            scan_results: run.results_of(StageName::Scan).cloned(),
            enrichment_insights: run.results_of(StageName::Enrich).cloned(),
            conversation,
            storage: run.results_of(StageName::Persist).cloned(),
            reports: run.results_of(StageName::Report).cloned(),
            per_stage_status: run.per_stage_status(),
            degraded_stages: run.degraded_stages(),
            error,
            can_retry: failed,
            timeout_notified: run.timeout_notified(),
        }
    }
}

//! converse stage: 대화 세션 생성

use serde_json::{Value, json};

use vigil_core::error::StageError;
use vigil_core::pipeline::{ConversationRequest, ConversationService};
use vigil_core::stage::{StageContext, StageExecutor, StageName};

/// scan 결과에 연결된 대화 세션을 여는 stage
pub struct ConverseStage<C> {
    service: C,
}

impl<C: ConversationService> ConverseStage<C> {
    /// 대화 서비스로 stage를 생성합니다.
    pub fn new(service: C) -> Self {
        Self { service }
    }
}

impl<C: ConversationService> StageExecutor for ConverseStage<C> {
    fn name(&self) -> &str {
        "conversation-session"
    }

    fn stage(&self) -> StageName {
        StageName::Converse
    }

    async fn execute(&self, ctx: &StageContext) -> Result<Value, StageError> {
        let request = ConversationRequest {
            pipeline_id: ctx.run_id.clone(),
            kind: ctx.kind,
            scan_results: ctx.scan_results().cloned().unwrap_or(Value::Null),
        };

        let session = self
            .service
            .start_session(&request)
            .await
            .map_err(|e| StageError::new(StageName::Converse, e.to_string()))?;

        if session.session_id.trim().is_empty() {
            return Err(StageError::new(
                StageName::Converse,
                "conversation service returned an empty session id",
            ));
        }

        Ok(json!({
            "sessionId": session.session_id,
            "suggestedPrompts": session.suggested_prompts,
        }))
    }
}

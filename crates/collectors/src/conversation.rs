//! 대화 세션 서비스 클라이언트
//!
//! 요청: `POST {url}` `{"pipelineId", "kind", "scanResults"}`
//! 응답: `{"sessionId", "suggestedPrompts"}`

use std::time::Duration;

use vigil_core::error::CollaboratorError;
use vigil_core::pipeline::{ConversationRequest, ConversationService, ConversationSession};

use crate::error::CollectorError;
use crate::http::{JsonEndpoint, reject_unsuccessful};

/// HTTP 대화 세션 서비스
#[derive(Debug, Clone)]
pub struct HttpConversationService {
    endpoint: JsonEndpoint,
}

impl HttpConversationService {
    /// 클라이언트를 생성합니다.
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, CollectorError> {
        Ok(Self {
            endpoint: JsonEndpoint::new("conversation.url", url, api_key, timeout)?,
        })
    }
}

impl ConversationService for HttpConversationService {
    async fn start_session(
        &self,
        request: &ConversationRequest,
    ) -> Result<ConversationSession, CollaboratorError> {
        let reply = reject_unsuccessful(self.endpoint.post(request).await?)?;
        serde_json::from_value(reply)
            .map_err(|e| CollaboratorError::InvalidResponse(format!("conversation session: {e}")))
    }
}

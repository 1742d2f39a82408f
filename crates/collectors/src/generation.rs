//! OpenAI 호환 `chat/completions` 텍스트 생성 클라이언트
//!
//! Groq, OpenAI, 로컬 호환 서버 모두 같은 요청 형태를 받습니다.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use vigil_core::error::CollaboratorError;
use vigil_core::pipeline::TextGenerator;

use crate::error::CollectorError;
use crate::http::JsonEndpoint;

const SYSTEM_PROMPT: &str = "You are a concise application security analyst. \
    Always start with a 'Risk Level:' line and list remediation steps as bullet points.";

const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// `chat/completions` 클라이언트
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    endpoint: JsonEndpoint,
    model: String,
}

impl ChatCompletionClient {
    /// 클라이언트를 생성합니다. `api_url`은 `/chat/completions`를 뺀 기본 URL입니다.
    pub fn new(
        api_url: &str,
        api_key: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CollectorError> {
        let base = JsonEndpoint::new("enrichment.api_url", api_url, api_key, timeout)?;
        Ok(Self {
            endpoint: base.join("chat/completions"),
            model: model.into(),
        })
    }

    /// 모델 이름
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextGenerator for ChatCompletionClient {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        let reply = self.endpoint.post(&request).await?;
        let content = reply
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.pointer("/message/content"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CollaboratorError::InvalidResponse("no message content in choices".to_owned())
            })?;

        debug!(model = %self.model, chars = content.len(), "text generated");
        Ok(content.to_owned())
    }
}

//! 공통 JSON-over-HTTP 엔드포인트

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use vigil_core::error::CollaboratorError;

use crate::error::CollectorError;

/// 응답 본문 중 에러 메시지에 남길 최대 길이
const MAX_ERROR_BODY: usize = 512;

/// bearer 인증과 timeout이 설정된 POST 엔드포인트
#[derive(Debug, Clone)]
pub(crate) struct JsonEndpoint {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl JsonEndpoint {
    /// 엔드포인트를 생성합니다.
    ///
    /// `field`는 에러 메시지에 쓰이는 설정 항목 이름입니다.
    pub(crate) fn new(
        field: &str,
        url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, CollectorError> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CollectorError::InvalidEndpoint {
                field: field.to_owned(),
                reason: format!("'{url}' must start with http:// or https://"),
            });
        }

        let client = Client::builder().timeout(timeout).build()?;
        let api_key = Some(api_key.trim())
            .filter(|key| !key.is_empty())
            .map(str::to_owned);

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_owned(),
            api_key,
        })
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// 하위 경로를 붙인 엔드포인트를 만듭니다.
    pub(crate) fn join(&self, path: &str) -> Self {
        Self {
            client: self.client.clone(),
            url: format!("{}/{}", self.url, path.trim_start_matches('/')),
            api_key: self.api_key.clone(),
        }
    }

    /// JSON 본문을 POST하고 응답 JSON을 반환합니다.
    ///
    /// 빈 응답 본문은 `Value::Null`입니다.
    pub(crate) async fn post(&self, body: &impl Serialize) -> Result<Value, CollaboratorError> {
        let mut request = self.client.post(&self.url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| send_error(&self.url, &e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
        debug!(url = %self.url, status = status.as_u16(), bytes = text.len(), "collaborator replied");

        if !status.is_success() {
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                body: truncate(&text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))
    }
}

fn send_error(url: &str, err: &reqwest::Error) -> CollaboratorError {
    if err.is_timeout() {
        CollaboratorError::Request(format!("request to {url} timed out"))
    } else if err.is_connect() {
        CollaboratorError::Request(format!("could not connect to {url}"))
    } else {
        CollaboratorError::Request(err.to_string())
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}

/// `{"success": false, "error"|"message": ...}` 응답을 거부 에러로 바꿉니다.
///
/// `success` 필드는 응답에서 제거됩니다.
pub(crate) fn reject_unsuccessful(reply: Value) -> Result<Value, CollaboratorError> {
    let Value::Object(mut map) = reply else {
        return Ok(reply);
    };

    match map.remove("success") {
        Some(Value::Bool(false)) => {
            let message = ["error", "message"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .unwrap_or("collaborator reported failure");
            Err(CollaboratorError::Rejected(message.to_owned()))
        }
        _ => Ok(Value::Object(map)),
    }
}

//! 이메일 발송 API 기반 timeout 알림
//!
//! 요청: `POST {url}` `{"from", "to", "subject", "text"}`

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use vigil_core::error::CollaboratorError;
use vigil_core::pipeline::{Notifier, TimeoutNotice};

use crate::error::CollectorError;
use crate::http::{JsonEndpoint, reject_unsuccessful};

#[derive(Debug, Serialize)]
struct EmailMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    text: String,
}

/// 이메일 알림
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    endpoint: JsonEndpoint,
    from: String,
}

impl EmailNotifier {
    /// 알림을 생성합니다.
    pub fn new(
        url: &str,
        api_key: &str,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CollectorError> {
        Ok(Self {
            endpoint: JsonEndpoint::new("notifier.url", url, api_key, timeout)?,
            from: from.into(),
        })
    }
}

impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, notice: &TimeoutNotice) -> Result<(), CollaboratorError> {
        let message = EmailMessage {
            from: &self.from,
            to: &notice.contact,
            subject: notice.subject(),
            text: notice.body(),
        };
        reject_unsuccessful(self.endpoint.post(&message).await?)?;
        debug!(pipeline_id = %notice.pipeline_id, "timeout e-mail accepted");
        Ok(())
    }
}

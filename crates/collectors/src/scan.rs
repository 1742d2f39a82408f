//! HTTP scan back-end
//!
//! 요청: `POST {url}` `{"kind", "input", "options"}`
//! 응답: `{"success": true, ...결과}` 또는 `{"success": false, "error"|"message": ...}`

use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use vigil_core::error::StageError;
use vigil_core::stage::{StageContext, StageExecutor, StageName};
use vigil_core::types::{ScanKind, count_findings};

use crate::error::CollectorError;
use crate::http::{JsonEndpoint, reject_unsuccessful};

/// kind 하나를 담당하는 원격 scan back-end
#[derive(Debug, Clone)]
pub struct HttpScanBackend {
    kind: ScanKind,
    name: String,
    endpoint: JsonEndpoint,
}

impl HttpScanBackend {
    /// back-end를 생성합니다. `api_key`가 비어 있으면 인증 헤더를 보내지 않습니다.
    pub fn new(
        kind: ScanKind,
        url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, CollectorError> {
        Ok(Self {
            kind,
            name: format!("http-scan:{kind}"),
            endpoint: JsonEndpoint::new("scanners.endpoints", url, api_key, timeout)?,
        })
    }

    /// 담당 kind
    pub fn kind(&self) -> ScanKind {
        self.kind
    }

    /// 요청 URL
    pub fn url(&self) -> &str {
        self.endpoint.url()
    }
}

impl StageExecutor for HttpScanBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn stage(&self) -> StageName {
        StageName::Scan
    }

    async fn execute(&self, ctx: &StageContext) -> Result<Value, StageError> {
        let body = json!({
            "kind": ctx.kind,
            "input": *ctx.input,
            "options": *ctx.options,
        });

        let results = self
            .endpoint
            .post(&body)
            .await
            .and_then(reject_unsuccessful)
            .map_err(|e| StageError::new(StageName::Scan, e.to_string()))?;

        debug!(
            run_id = %ctx.run_id,
            backend = %self.name,
            findings = count_findings(&results),
            "scan back-end returned results"
        );
        Ok(results)
    }
}

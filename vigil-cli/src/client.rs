//! Minimal HTTP client for the daemon API.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::CliError;

/// Request timeout for daemon queries.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a running vigil-daemon.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    base_url: String,
    client: Client,
}

impl DaemonClient {
    /// Create a client. A bare `host:port` gets an `http://` scheme.
    pub fn new(base_url: &str) -> Result<Self, CliError> {
        let base_url = base_url.trim().trim_end_matches('/');
        let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url.to_owned()
        } else {
            format!("http://{base_url}")
        };
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CliError::Command(format!("failed to build http client: {e}")))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON document.
    ///
    /// `/health` answers 503 with a full report when unhealthy, so callers
    /// that can use an error-status body pass `accept_error_body`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        accept_error_body: bool,
    ) -> Result<T, CliError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "querying daemon");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CliError::DaemonUnavailable(format!("{}: {}", self.base_url, e)))?;

        let status = response.status();
        if !status.is_success() && !accept_error_body {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
                .unwrap_or(body);
            return Err(CliError::Daemon {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CliError::Command(format!("failed to parse daemon response: {e}")))
    }
}

//! Mock stage executors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::Value;
use vigil_core::error::StageError;
use vigil_core::stage::{StageContext, StageExecutor, StageName};

/// Scan back-end that returns a fixed payload, optionally after a delay.
pub struct StaticScan {
    response: Result<Value, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StaticScan {
    /// Back-end that succeeds with `payload`.
    pub fn ok(payload: Value) -> Self {
        Self {
            response: Ok(payload),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Back-end that fails with `cause`.
    pub fn failing(cause: &str) -> Self {
        Self {
            response: Err(cause.to_owned()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times the back-end was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StageExecutor for StaticScan {
    fn name(&self) -> &str {
        "static-scan"
    }

    fn stage(&self) -> StageName {
        StageName::Scan
    }

    async fn execute(&self, _ctx: &StageContext) -> Result<Value, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response
            .clone()
            .map_err(|cause| StageError::new(StageName::Scan, cause))
    }
}

/// Stage that always fails with the given cause.
#[allow(dead_code)]
pub struct FailingStage {
    pub stage: StageName,
    pub cause: &'static str,
}

impl StageExecutor for FailingStage {
    fn name(&self) -> &str {
        "failing"
    }

    fn stage(&self) -> StageName {
        self.stage
    }

    async fn execute(&self, _ctx: &StageContext) -> Result<Value, StageError> {
        Err(StageError::new(self.stage, self.cause))
    }
}

/// Stage that panics while executing.
#[allow(dead_code)]
pub struct PanickingStage(pub StageName);

impl StageExecutor for PanickingStage {
    fn name(&self) -> &str {
        "panicking"
    }

    fn stage(&self) -> StageName {
        self.0
    }

    async fn execute(&self, _ctx: &StageContext) -> Result<Value, StageError> {
        panic!("converter blew up");
    }
}

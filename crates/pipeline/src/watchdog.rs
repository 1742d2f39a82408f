//! timeout watchdog: 관찰 전용 단발 타이머
//!
//! 실행이 설정된 시간 안에 끝나지 않으면 연락처로 best-effort 알림을 보냅니다.
//! 실행 자체는 취소하거나 변경하지 않습니다.
//!
//! # 상태
//! ```text
//! Armed ──(timeout)──> Fired
//!   └────(disarm)────> Disarmed
//! ```
//! 발화와 해제는 같은 원자 변수에 대한 compare-exchange로 경합합니다.
//! `disarm()`이 반환된 뒤에는 새 알림이 시작될 수 없습니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vigil_core::metrics as m;
use vigil_core::pipeline::{DynNotifier, TimeoutNotice};
use vigil_core::types::ScanKind;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const DISARMED: u8 = 2;

/// 기본 timeout (2분)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// timeout 알림 정책
///
/// 오케스트레이터가 실행마다 [`TimeoutPolicy::arm`]으로 watchdog을 하나씩 겁니다.
#[derive(Clone)]
pub struct TimeoutPolicy {
    timeout: Duration,
    notifier: Option<Arc<dyn DynNotifier>>,
    notify: bool,
}

impl TimeoutPolicy {
    /// 알림 서비스 없이 로그만 남기는 정책을 생성합니다.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            notifier: None,
            notify: true,
        }
    }

    /// 알림 서비스를 지정합니다.
    pub fn with_notifier(mut self, notifier: Arc<dyn DynNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// 연락처 알림 여부를 지정합니다. `false`면 발화해도 로그만 남깁니다.
    pub fn notify_contacts(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    /// 설정된 timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 실행 하나에 대한 watchdog을 겁니다.
    pub fn arm(&self, run_id: &str, kind: ScanKind, contact: Option<String>) -> WatchdogHandle {
        let state = Arc::new(AtomicU8::new(ARMED));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(watch(
            Arc::clone(&state),
            cancel.clone(),
            self.timeout,
            FireContext {
                run_id: run_id.to_owned(),
                kind,
                contact: contact.filter(|c| !c.trim().is_empty()),
                notifier: if self.notify {
                    self.notifier.clone()
                } else {
                    None
                },
                timeout_secs: self.timeout.as_secs(),
            },
        ));

        WatchdogHandle {
            state,
            cancel,
            task: Some(task),
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl std::fmt::Debug for TimeoutPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutPolicy")
            .field("timeout", &self.timeout)
            .field("notifier", &self.notifier.as_ref().map(|n| n.name().to_owned()))
            .field("notify", &self.notify)
            .finish()
    }
}

struct FireContext {
    run_id: String,
    kind: ScanKind,
    contact: Option<String>,
    notifier: Option<Arc<dyn DynNotifier>>,
    timeout_secs: u64,
}

async fn watch(
    state: Arc<AtomicU8>,
    cancel: CancellationToken,
    timeout: Duration,
    ctx: FireContext,
) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(timeout) => {}
    }

    if state
        .compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return;
    }

    counter!(m::WATCHDOG_TIMEOUTS_TOTAL).increment(1);
    warn!(
        run_id = %ctx.run_id,
        kind = %ctx.kind,
        timeout_secs = ctx.timeout_secs,
        "pipeline run exceeded timeout, still running"
    );

    let (Some(contact), Some(notifier)) = (ctx.contact, ctx.notifier) else {
        debug!(run_id = %ctx.run_id, "no contact or notifier configured, timeout logged only");
        return;
    };

    let notice = TimeoutNotice {
        pipeline_id: ctx.run_id,
        kind: ctx.kind,
        contact,
        timeout_secs: ctx.timeout_secs,
    };
    match notifier.notify(&notice).await {
        Ok(()) => {
            counter!(m::WATCHDOG_NOTIFICATIONS_TOTAL, m::LABEL_RESULT => "success").increment(1);
            info!(
                run_id = %notice.pipeline_id,
                notifier = notifier.name(),
                "timeout notification sent"
            );
        }
        Err(e) => {
            counter!(m::WATCHDOG_NOTIFICATIONS_TOTAL, m::LABEL_RESULT => "failure").increment(1);
            warn!(
                run_id = %notice.pipeline_id,
                notifier = notifier.name(),
                error = %e,
                "timeout notification failed"
            );
        }
    }
}

/// 걸려 있는 watchdog 하나
///
/// 핸들을 drop하면 아직 발화하지 않은 watchdog은 해제됩니다.
/// 이미 시작된 알림 전송은 중단되지 않습니다.
pub struct WatchdogHandle {
    state: Arc<AtomicU8>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatchdogHandle {
    /// watchdog을 해제합니다.
    ///
    /// 발화 전에 해제했으면 `true`, 이미 발화했으면 `false`를 반환합니다.
    /// 반환 이후에는 알림이 새로 시작되지 않습니다.
    pub fn disarm(&self) -> bool {
        let disarmed = self
            .state
            .compare_exchange(ARMED, DISARMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.cancel.cancel();
        disarmed
    }

    /// 발화했는지 여부
    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }

    /// watchdog task가 끝날 때까지 기다립니다 (발화했다면 알림 전송 완료까지).
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        let _ = self
            .state
            .compare_exchange(ARMED, DISARMED, Ordering::AcqRel, Ordering::Acquire);
        self.cancel.cancel();
    }
}

//! 협력자 trait: stage 뒤에 있는 외부 서비스 확장 포인트
//!
//! enrich, converse, persist stage와 timeout 알림은 외부 서비스를 호출합니다.
//! 각 서비스는 아래 trait 뒤에 숨어 있으므로 HTTP 클라이언트, 로컬 파일 저장소,
//! 테스트용 mock을 자유롭게 바꿔 끼울 수 있습니다.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CollaboratorError;
use crate::types::ScanKind;

/// `Send`를 만족하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ─── HealthStatus ────────────────────────────────────────────────────

/// 구성 요소의 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 일부 기능 저하 (동작은 함)
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 여부
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 상태인지 여부
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

// ─── TextGenerator ───────────────────────────────────────────────────

/// 텍스트 생성 서비스 (enrich stage)
///
/// 템플릿으로 만든 프롬프트를 받아 자유 형식 텍스트를 돌려줍니다.
pub trait TextGenerator: Send + Sync {
    /// 프롬프트에 대한 응답 텍스트를 생성합니다.
    fn generate(&self, prompt: &str)
    -> impl Future<Output = Result<String, CollaboratorError>> + Send;
}

impl<T: TextGenerator> TextGenerator for Arc<T> {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, CollaboratorError>> + Send {
        (**self).generate(prompt)
    }
}

// ─── ConversationService ─────────────────────────────────────────────

/// 대화 세션 생성 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    /// 실행 ID
    pub pipeline_id: String,
    /// 요청 유형
    pub kind: ScanKind,
    /// scan stage 결과
    pub scan_results: Value,
}

/// 생성된 대화 세션
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    /// 세션 핸들
    pub session_id: String,
    /// 제안 후속 질문
    #[serde(default)]
    pub suggested_prompts: Vec<String>,
}

/// 대화 세션 서비스 (converse stage)
pub trait ConversationService: Send + Sync {
    /// scan 결과에 연결된 대화 세션을 시작합니다.
    fn start_session(
        &self,
        request: &ConversationRequest,
    ) -> impl Future<Output = Result<ConversationSession, CollaboratorError>> + Send;
}

impl<T: ConversationService> ConversationService for Arc<T> {
    fn start_session(
        &self,
        request: &ConversationRequest,
    ) -> impl Future<Output = Result<ConversationSession, CollaboratorError>> + Send {
        (**self).start_session(request)
    }
}

// ─── SnapshotStore ───────────────────────────────────────────────────

/// 결과 스냅샷 저장소 (persist stage)
pub trait SnapshotStore: Send + Sync {
    /// 스냅샷을 저장하고 저장소 핸들을 반환합니다.
    fn store(&self, snapshot: &Value)
    -> impl Future<Output = Result<String, CollaboratorError>> + Send;
}

impl<T: SnapshotStore> SnapshotStore for Arc<T> {
    fn store(&self, snapshot: &Value) -> impl Future<Output = Result<String, CollaboratorError>> + Send {
        (**self).store(snapshot)
    }
}

// ─── Notifier ────────────────────────────────────────────────────────

/// timeout 알림 내용
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutNotice {
    /// 실행 ID
    pub pipeline_id: String,
    /// 요청 유형
    pub kind: ScanKind,
    /// 수신자 (이메일 주소 등)
    pub contact: String,
    /// 설정된 timeout (초)
    pub timeout_secs: u64,
}

impl TimeoutNotice {
    /// 알림 제목
    pub fn subject(&self) -> String {
        format!("Security pipeline {} is taking longer than expected", self.kind)
    }

    /// 알림 본문
    pub fn body(&self) -> String {
        format!(
            "Pipeline {} ({}) has been running for more than {} seconds. \
             It is still in progress and results will be available once it finishes.",
            self.pipeline_id, self.kind, self.timeout_secs
        )
    }
}

/// 외부 알림 서비스 (timeout watchdog)
///
/// 호출은 fire-and-forget이며 실패는 로그로만 남습니다.
pub trait Notifier: Send + Sync {
    /// 알림 이름 (로그용)
    fn name(&self) -> &str;

    /// 알림을 보냅니다.
    fn notify(&self, notice: &TimeoutNotice)
    -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}

/// dyn-compatible 알림 trait
///
/// watchdog이 `Arc<dyn DynNotifier>`로 알림 서비스를 보관할 때 사용합니다.
pub trait DynNotifier: Send + Sync {
    /// 알림 이름
    fn name(&self) -> &str;

    /// 알림을 보냅니다.
    fn notify<'a>(&'a self, notice: &'a TimeoutNotice) -> BoxFuture<'a, Result<(), CollaboratorError>>;
}

impl<T: Notifier> DynNotifier for T {
    fn name(&self) -> &str {
        Notifier::name(self)
    }

    fn notify<'a>(&'a self, notice: &'a TimeoutNotice) -> BoxFuture<'a, Result<(), CollaboratorError>> {
        Box::pin(Notifier::notify(self, notice))
    }
}

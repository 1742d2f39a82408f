//! 에러 타입: 도메인별 에러 정의

use crate::stage::StageName;

/// Vigil 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// stage 실행 에러
    #[error("stage error: {0}")]
    Stage(#[from] StageError),

    /// 실행 레지스트리 에러
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// 파이프라인 실행 엔진 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 외부 협력자 호출 에러
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// stage 실행 실패
///
/// 어느 stage에서 실패했는지와 사람이 읽을 수 있는 원인을 담습니다.
/// scan stage의 실패는 실행 전체를 중단시키고, 나머지 stage의 실패는
/// stage 맵에 기록된 뒤 다음 stage로 진행합니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} stage failed: {cause}")]
pub struct StageError {
    /// 실패한 stage
    pub stage: StageName,
    /// 실패 원인
    pub cause: String,
}

impl StageError {
    /// 새 stage 에러를 생성합니다.
    pub fn new(stage: StageName, cause: impl Into<String>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}

/// 실행 레지스트리 에러
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// 같은 ID의 실행이 이미 등록되어 있음
    #[error("run already registered: {id}")]
    AlreadyRegistered { id: String },

    /// 활성 집합에 없는 실행 (이미 이력으로 이동했거나 미등록)
    #[error("run is not active: {id}")]
    NotActive { id: String },
}

/// 파이프라인 실행 엔진 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 허용되지 않는 상태 전이
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// 엔진 구성 실패
    #[error("build failed: {0}")]
    BuildFailed(String),
}

/// 외부 협력자 호출 에러
///
/// 스캐너, 텍스트 생성, 대화 세션, 스토리지, 알림 서비스 호출 시 발생합니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// 요청 전송 실패 (연결, 타임아웃 등)
    #[error("request failed: {0}")]
    Request(String),

    /// 2xx가 아닌 HTTP 응답
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// 응답 본문을 해석할 수 없음
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// 협력자가 `success: false`로 요청을 거부함
    #[error("{0}")]
    Rejected(String),

    /// 로컬 I/O 실패
    #[error("io failure: {0}")]
    Io(String),
}

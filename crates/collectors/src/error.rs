//! 협력자 클라이언트 구성 에러
//!
//! 호출 중 발생하는 에러는 `vigil_core::error::CollaboratorError`로 보고되고,
//! 여기의 [`CollectorError`]는 클라이언트를 만들고 연결하는 단계의 에러입니다.

use vigil_core::error::{CollaboratorError, ConfigError, VigilError};
use vigil_pipeline::PipelineEngineError;

/// 협력자 클라이언트 구성 에러
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// HTTP 클라이언트 생성 실패
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// 엔드포인트 설정 오류
    #[error("invalid endpoint for {field}: {reason}")]
    InvalidEndpoint {
        /// 설정 항목
        field: String,
        /// 사유
        reason: String,
    },

    /// 오케스트레이터 구성 실패
    #[error(transparent)]
    Pipeline(#[from] PipelineEngineError),
}

impl From<CollectorError> for VigilError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::HttpClient(e) => {
                VigilError::Collaborator(CollaboratorError::Request(e.to_string()))
            }
            CollectorError::InvalidEndpoint { field, reason } => {
                VigilError::Config(ConfigError::InvalidValue { field, reason })
            }
            CollectorError::Pipeline(e) => e.into(),
        }
    }
}

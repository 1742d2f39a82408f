//! 파이프라인 엔진 에러 타입
//!
//! [`PipelineEngineError`]는 실행 상태 전이, 레지스트리, 엔진 구성에서 발생하는 에러입니다.
//! stage 자체의 실패는 에러가 아니라 실행 기록의 일부이므로 여기에 포함되지 않습니다.

use vigil_core::error::{ConfigError, PipelineError, RegistryError, VigilError};
use vigil_core::stage::StageName;

use crate::run::{RunStatus, StageState};

/// 파이프라인 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineEngineError {
    /// stage 상태가 역행하거나 건너뛰려 함
    #[error("illegal {stage} stage transition: {from} -> {to}")]
    StageTransition {
        /// 대상 stage
        stage: StageName,
        /// 현재 상태
        from: StageState,
        /// 요청된 상태
        to: StageState,
    },

    /// 앞선 stage가 끝나기 전에 다음 stage를 시작하려 함
    #[error("{stage} stage cannot start while {blocking} stage is {state}")]
    StageOutOfOrder {
        /// 시작하려는 stage
        stage: StageName,
        /// 아직 끝나지 않은 stage
        blocking: StageName,
        /// 그 stage의 상태
        state: StageState,
    },

    /// 실행 중인 stage가 남아 있는데 실행을 끝내려 함
    #[error("run cannot finish while {stage} stage is running")]
    StageStillRunning {
        /// 실행 중인 stage
        stage: StageName,
    },

    /// 이미 종료된 실행을 변경하려 함
    #[error("run {run_id} is already {status}")]
    RunFinished {
        /// 실행 ID
        run_id: String,
        /// 종료 상태
        status: RunStatus,
    },

    /// 레지스트리 에러
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// 엔진 구성 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 항목
        field: String,
        /// 사유
        reason: String,
    },
}

impl From<PipelineEngineError> for VigilError {
    fn from(err: PipelineEngineError) -> Self {
        match err {
            PipelineEngineError::Registry(e) => VigilError::Registry(e),
            PipelineEngineError::Config { field, reason } => {
                VigilError::Config(ConfigError::InvalidValue { field, reason })
            }
            other @ (PipelineEngineError::StageTransition { .. }
            | PipelineEngineError::StageOutOfOrder { .. }
            | PipelineEngineError::StageStillRunning { .. }
            | PipelineEngineError::RunFinished { .. }) => {
                VigilError::Pipeline(PipelineError::InvalidTransition(other.to_string()))
            }
        }
    }
}

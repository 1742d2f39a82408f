#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod stage;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{
    CollaboratorError, ConfigError, PipelineError, RegistryError, StageError, VigilError,
};

// 설정
pub use config::VigilConfig;

// 협력자 trait
pub use pipeline::{
    BoxFuture, ConversationRequest, ConversationService, ConversationSession, DynNotifier,
    HealthStatus, Notifier, SnapshotStore, TextGenerator, TimeoutNotice,
};

// stage 실행기
pub use stage::{DynStageExecutor, StageContext, StageExecutor, StageName};

// 도메인 타입
pub use types::{Finding, ScanKind, ScanReport, Severity};

#![doc = include_str!("../README.md")]

pub mod error;
pub mod insights;
pub mod orchestrator;
pub mod registry;
pub mod response;
pub mod run;
pub mod stages;
pub mod watchdog;

pub use error::PipelineEngineError;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, PipelineRequest, StageHealth};
pub use registry::{DEFAULT_HISTORY_CAPACITY, RunRegistry};
pub use response::{ConversationEnvelope, PipelineResponse};
pub use run::{PipelineRun, RunMetrics, RunStatus, StageState, StageStatus};
pub use watchdog::{TimeoutPolicy, WatchdogHandle};

//! CLI-specific error types and exit code mapping

use vigil_core::error::VigilError;

/// CLI-specific error type.
///
/// `exit_code()` maps each variant to a process exit code.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Cannot reach the daemon (`status`, `history`).
    #[error("daemon not reachable: {0}")]
    DaemonUnavailable(String),

    /// The daemon answered with an error status.
    #[error("daemon returned {status}: {message}")]
    Daemon { status: u16, message: String },

    /// The pipeline ran but its scan stage failed.
    #[error("pipeline {pipeline_id} failed: {reason}")]
    PipelineFailed { pipeline_id: String, reason: String },

    /// JSON (de)serialisation failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from vigil-core.
    #[error("{0}")]
    Core(#[from] VigilError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                       |
    /// |------|-------------------------------|
    /// | 0    | Success                       |
    /// | 1    | General / command error       |
    /// | 2    | Configuration error           |
    /// | 3    | Daemon unreachable or failing |
    /// | 4    | Pipeline run failed           |
    /// | 10   | IO error                      |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(VigilError::Config(_)) => 2,
            Self::DaemonUnavailable(_) | Self::Daemon { .. } => 3,
            Self::PipelineFailed { .. } => 4,
            Self::Io(_) => 10,
            Self::Json(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<vigil_collectors::CollectorError> for CliError {
    fn from(e: vigil_collectors::CollectorError) -> Self {
        Self::Core(e.into())
    }
}

//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use vigil_core::types::ScanKind;

/// Vigil -- security pipeline orchestrator.
///
/// Use `vigil <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about, long_about = None)]
pub struct Cli {
    /// Path to the vigil.toml configuration file.
    #[arg(short, long, default_value = "vigil.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Daemon base URL (default: http://{api.bind} from the config file).
    #[arg(long, global = true)]
    pub daemon_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute one pipeline in-process and print the result envelope.
    Run(RunArgs),

    /// Show health of a running daemon.
    Status(StatusArgs),

    /// List recently finished runs of a running daemon.
    History(HistoryArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Run a pipeline without a daemon.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Request kind (code-analysis, repository-scan, bucket-scan,
    /// dependency-scan, secret-scan).
    #[arg(short, long)]
    pub kind: ScanKind,

    /// Scan input: path to a JSON file or an inline JSON document.
    #[arg(short, long)]
    pub input: String,

    /// Options passed to every stage (inline JSON).
    #[arg(long)]
    pub options: Option<String>,

    /// Contact notified if the run exceeds the timeout.
    #[arg(long)]
    pub contact: Option<String>,
}

// ---- status ----

/// Display daemon health.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show per-stage health.
    #[arg(short, long)]
    pub verbose: bool,
}

// ---- history ----

/// List finished runs, most recent first.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Maximum number of runs.
    #[arg(short, long)]
    pub limit: Option<usize>,
}

// ---- config ----

/// Manage vigil configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only one section (general, pipeline, scanners, enrichment,
        /// conversation, storage, notifier, api, metrics).
        section: Option<String>,
    },
}

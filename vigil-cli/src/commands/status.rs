//! `vigil status` command handler

use std::io::Write;

use serde::{Deserialize, Serialize};

use vigil_core::pipeline::HealthStatus;
use vigil_core::stage::StageName;

use crate::cli::StatusArgs;
use crate::client::DaemonClient;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `status` command.
pub async fn execute(
    args: StatusArgs,
    daemon_url: &str,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let client = DaemonClient::new(daemon_url)?;
    // an unhealthy daemon answers 503 with a full report
    let health: HealthReport = client.get_json("/health", true).await?;

    let report = StatusReport {
        daemon: client.base_url().to_owned(),
        verbose: args.verbose,
        health,
    };
    writer.render(&report)
}

/// Health document served by the daemon at `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub uptime_secs: u64,
    pub active_runs: usize,
    pub history_size: usize,
    #[serde(default)]
    pub stages: Vec<StageReport>,
}

/// One stage entry of [`HealthReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub name: String,
    pub stage: StageName,
    pub status: HealthStatus,
}

/// Output payload of `vigil status`.
#[derive(Serialize)]
pub struct StatusReport {
    pub daemon: String,
    #[serde(skip)]
    pub verbose: bool,
    #[serde(flatten)]
    pub health: HealthReport,
}

fn status_label(status: &HealthStatus) -> colored::ColoredString {
    use colored::Colorize;

    match status {
        HealthStatus::Healthy => "healthy".green(),
        HealthStatus::Degraded(reason) => format!("degraded ({reason})").yellow(),
        HealthStatus::Unhealthy(reason) => format!("unhealthy ({reason})").red(),
    }
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let h = &self.health;
        writeln!(w, "Vigil daemon: {}", self.daemon.bold())?;
        writeln!(w, "  Status:  {}", status_label(&h.status))?;
        writeln!(w, "  Uptime:  {}s", h.uptime_secs)?;
        writeln!(w, "  Active:  {}", h.active_runs)?;
        writeln!(w, "  History: {}", h.history_size)?;

        if self.verbose {
            writeln!(w)?;
            writeln!(w, "  {:<10} {:<20} {}", "STAGE", "EXECUTOR", "HEALTH")?;
            for stage in &h.stages {
                writeln!(
                    w,
                    "  {:<10} {:<20} {}",
                    stage.stage.to_string(),
                    stage.name,
                    status_label(&stage.status)
                )?;
            }
        }
        Ok(())
    }
}

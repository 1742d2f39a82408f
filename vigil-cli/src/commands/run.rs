//! `vigil run` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use vigil_core::config::VigilConfig;
use vigil_core::stage::StageName;
use vigil_pipeline::{PipelineRequest, PipelineResponse, RunRegistry, RunStatus, StageState};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, format_duration_ms};

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = VigilConfig::load(config_path).await?;

    let input = parse_json_arg("--input", &args.input)?;
    let options = match &args.options {
        Some(raw) => parse_json_arg("--options", raw)?,
        None => Value::Object(Default::default()),
    };

    let registry = Arc::new(RunRegistry::new(config.pipeline.history_capacity));
    let orchestrator = vigil_collectors::orchestrator_from_config(&config, registry)?;

    let mut request = PipelineRequest::new(args.kind, input).with_options(options);
    if let Some(contact) = args.contact {
        request = request.with_contact(contact);
    }

    info!(kind = %args.kind, "running pipeline");
    let response = orchestrator.execute_pipeline(request).await;

    let report = RunReport(response);
    writer.render(&report)?;

    let RunReport(response) = report;
    if response.status == RunStatus::Failed {
        return Err(CliError::PipelineFailed {
            pipeline_id: response.pipeline_id,
            reason: response.error.unwrap_or_else(|| "pipeline failed".to_owned()),
        });
    }
    Ok(())
}

/// Parse a JSON argument given either as a file path or inline.
pub fn parse_json_arg(flag: &str, raw: &str) -> Result<Value, CliError> {
    let path = Path::new(raw);
    if path.is_file() {
        let content = std::fs::read_to_string(path)?;
        return serde_json::from_str(&content).map_err(|e| {
            CliError::Command(format!("{flag}: {} is not valid JSON: {e}", path.display()))
        });
    }
    serde_json::from_str(raw).map_err(|e| {
        CliError::Command(format!(
            "{flag} is neither a readable file nor valid JSON: {e}"
        ))
    })
}

/// Result envelope of a single run.
#[derive(Serialize)]
#[serde(transparent)]
pub struct RunReport(pub PipelineResponse);

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let r = &self.0;
        let status = match r.status {
            RunStatus::Completed if r.degraded_stages.is_empty() => "COMPLETED".green().bold(),
            RunStatus::Completed => "COMPLETED (degraded)".yellow().bold(),
            RunStatus::Failed => "FAILED".red().bold(),
            RunStatus::Running => "RUNNING".normal(),
        };

        writeln!(w, "Pipeline {} [{}]", r.pipeline_id.bold(), r.kind)?;
        writeln!(
            w,
            "  Status: {}  ({})",
            status,
            format_duration_ms(r.execution_time_ms)
        )?;

        writeln!(w)?;
        writeln!(w, "  Stages:")?;
        for stage in StageName::ORDERED {
            let state = r
                .per_stage_status
                .get(&stage)
                .copied()
                .unwrap_or(StageState::Pending);
            let label = match state {
                StageState::Completed => "completed".green(),
                StageState::Failed => "failed".red(),
                other => format!("{other:?}").to_lowercase().normal(),
            };
            writeln!(w, "    {:<10} {}", stage.to_string(), label)?;
        }

        if let Some(metrics) = r.reports.as_ref().map(|v| &v["securityMetrics"]) {
            writeln!(w)?;
            writeln!(
                w,
                "  Findings: {}  (risk score {}, max severity {})",
                metrics["totalFindings"],
                metrics["riskScore"],
                metrics["maxSeverity"].as_str().unwrap_or("none")
            )?;
        }

        if let Some(insights) = &r.enrichment_insights {
            writeln!(
                w,
                "  Risk level: {}",
                insights["riskLevel"].as_str().unwrap_or("unknown")
            )?;
            if let Some(plan) = insights["remediationPlan"].as_array() {
                for (i, step) in plan.iter().filter_map(Value::as_str).enumerate() {
                    writeln!(w, "    {}. {}", i + 1, step)?;
                }
            }
        }

        if let Some(conversation) = &r.conversation {
            if let Some(session) = &conversation.session_id {
                writeln!(w, "  Conversation: {session}")?;
            }
        }
        if let Some(id) = r.storage.as_ref().and_then(|s| s["storageId"].as_str()) {
            writeln!(w, "  Stored as: {id}")?;
        }
        if r.timeout_notified {
            writeln!(w, "  {}", "timeout notice was sent".yellow())?;
        }
        if let Some(error) = &r.error {
            writeln!(w)?;
            writeln!(w, "  Error: {}", error.red())?;
            if r.can_retry {
                writeln!(w, "  The run can be retried.")?;
            }
        }
        Ok(())
    }
}

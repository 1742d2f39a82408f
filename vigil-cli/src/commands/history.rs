//! `vigil history` command handler

use std::io::Write;

use chrono::Local;
use serde::Serialize;

use vigil_pipeline::{PipelineRun, RunStatus};

use crate::cli::HistoryArgs;
use crate::client::DaemonClient;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, format_duration_ms};

/// Execute the `history` command.
pub async fn execute(
    args: HistoryArgs,
    daemon_url: &str,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let client = DaemonClient::new(daemon_url)?;
    let path = match args.limit {
        Some(limit) => format!("/api/pipeline/history?limit={limit}"),
        None => "/api/pipeline/history".to_owned(),
    };
    let runs: Vec<PipelineRun> = client.get_json(&path, false).await?;

    writer.render(&HistoryReport { runs })
}

/// Finished runs, most recent first.
#[derive(Serialize)]
#[serde(transparent)]
pub struct HistoryReport {
    pub runs: Vec<PipelineRun>,
}

impl Render for HistoryReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::{Color, Colorize};

        if self.runs.is_empty() {
            return writeln!(w, "No finished runs.");
        }

        writeln!(
            w,
            "{:<36}  {:<16}  {:<20}  {:<20}  {:>9}",
            "ID", "KIND", "STATUS", "STARTED", "DURATION"
        )?;
        for run in &self.runs {
            let (label, color) = match run.status() {
                RunStatus::Completed if run.is_degraded() => {
                    ("completed (degraded)", Color::Yellow)
                }
                RunStatus::Completed => ("completed", Color::Green),
                RunStatus::Failed => ("failed", Color::Red),
                RunStatus::Running => ("running", Color::White),
            };
            // pad before colorizing so escape codes do not count toward the width
            let status = format!("{label:<20}").color(color);
            let started = run.started_at().with_timezone(&Local);
            let duration = run
                .metrics()
                .total_duration_ms
                .map(format_duration_ms)
                .unwrap_or_else(|| "-".to_owned());
            writeln!(
                w,
                "{:<36}  {:<16}  {}  {:<20}  {:>9}",
                run.id(),
                run.kind().to_string(),
                status,
                started.format("%Y-%m-%d %H:%M:%S").to_string(),
                duration
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use vigil_core::types::ScanKind;

    use super::*;

    #[test]
    fn empty_history_message() {
        let mut buffer = Vec::new();
        HistoryReport { runs: Vec::new() }
            .render_text(&mut buffer)
            .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "No finished runs.\n");
    }

    #[test]
    fn rows_show_id_and_kind() {
        let run = PipelineRun::with_id("run-42", ScanKind::BucketScan, json!({}), json!({}));

        let mut buffer = Vec::new();
        HistoryReport { runs: vec![run] }
            .render_text(&mut buffer)
            .unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert!(output.contains("run-42"));
        assert!(output.contains("bucket-scan"));
    }

    #[test]
    fn status_is_padded_inside_the_color_codes() {
        // Given: colored output forced on
        colored::control::set_override(true);
        let runs = vec![PipelineRun::with_id(
            "run-a",
            ScanKind::SecretScan,
            json!({}),
            json!({}),
        )];

        // When
        let mut buffer = Vec::new();
        HistoryReport { runs }.render_text(&mut buffer).unwrap();
        colored::control::unset_override();
        let output = String::from_utf8(buffer).unwrap();

        // Then: the reset code follows the padding, not the bare label
        let padded = format!("{:<20}\x1b[0m", "running");
        assert!(output.contains(&padded), "got: {output:?}");
    }

    #[test]
    fn json_is_a_plain_array() {
        let run = PipelineRun::with_id("run-1", ScanKind::SecretScan, json!({}), json!({}));
        let value = serde_json::to_value(HistoryReport { runs: vec![run] }).unwrap();

        assert!(value.is_array());
        assert_eq!(value[0]["id"], "run-1");
    }
}

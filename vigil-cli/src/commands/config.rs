//! `vigil config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use vigil_core::config::VigilConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Placeholder written over secrets in `config show`.
pub const REDACTED: &str = "***REDACTED***";

/// Section names accepted by `config show <section>`.
pub const SECTIONS: [&str; 9] = [
    "general",
    "pipeline",
    "scanners",
    "enrichment",
    "conversation",
    "storage",
    "notifier",
    "api",
    "metrics",
];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration file, reporting the first error.
///
/// # Errors
///
/// Returns `CliError::Config` when the file is missing, malformed or invalid.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match VigilConfig::load(config_path).await {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

/// Show the effective configuration (file + env overrides + defaults)
/// with API keys redacted.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let mut config = VigilConfig::load(config_path).await?;
    redact_secrets(&mut config);

    let report = build_report(&config, config_path, section.as_deref())?;
    writer.render(&report)
}

/// Serialize the whole configuration or one section as TOML.
pub fn build_report(
    config: &VigilConfig,
    config_path: &Path,
    section: Option<&str>,
) -> Result<ConfigReport, CliError> {
    let config_toml = match section {
        None => to_toml(config),
        Some("general") => to_toml(&config.general),
        Some("pipeline") => to_toml(&config.pipeline),
        Some("scanners") => to_toml(&config.scanners),
        Some("enrichment") => to_toml(&config.enrichment),
        Some("conversation") => to_toml(&config.conversation),
        Some("storage") => to_toml(&config.storage),
        Some("notifier") => to_toml(&config.notifier),
        Some("api") => to_toml(&config.api),
        Some("metrics") => to_toml(&config.metrics),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source: config_path.display().to_string(),
        section: section.map(str::to_owned),
        config_toml,
    })
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {})", e))
}

/// Replace every non-empty API key with [`REDACTED`].
pub fn redact_secrets(config: &mut VigilConfig) {
    for key in [
        &mut config.scanners.api_key,
        &mut config.enrichment.api_key,
        &mut config.conversation.api_key,
        &mut config.storage.api_key,
        &mut config.notifier.api_key,
    ] {
        if !key.is_empty() {
            *key = REDACTED.to_owned();
        }
    }
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let scope = match &self.section {
            Some(section) => format!("[{section}]"),
            None => "all sections".to_owned(),
        };
        writeln!(w, "# {} from {}", scope.bold(), self.source)?;
        writeln!(w, "# api keys are shown as {}", REDACTED.dimmed())?;
        writeln!(w)?;
        write!(w, "{}", self.config_toml)
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when valid.
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.valid {
            return writeln!(w, "{} {}", "ok".green().bold(), self.source);
        }
        writeln!(w, "{} {}", "invalid".red().bold(), self.source)?;
        for err in &self.errors {
            writeln!(w, "  - {}", err)?;
        }
        Ok(())
    }
}

//! `vigil` -- security pipeline orchestrator CLI.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vigil_cli::cli::{Cli, Commands};
use vigil_cli::commands;
use vigil_cli::error::CliError;
use vigil_cli::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_deref());

    if let Err(e) = dispatch(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

/// Log to stderr so `--output json` stays machine-readable.
///
/// `--log-level` wins over `RUST_LOG`; the default keeps the CLI quiet.
fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, &cli.config, &writer).await,
        Commands::Status(args) => {
            let url = commands::resolve_daemon_url(cli.daemon_url.as_deref(), &cli.config).await;
            commands::status::execute(args, &url, &writer).await
        }
        Commands::History(args) => {
            let url = commands::resolve_daemon_url(cli.daemon_url.as_deref(), &cli.config).await;
            commands::history::execute(args, &url, &writer).await
        }
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}

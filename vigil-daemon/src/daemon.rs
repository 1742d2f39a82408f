//! Daemon assembly and lifecycle.
//!
//! [`Daemon`] loads configuration, wires the pipeline orchestrator and
//! its shared run registry, and serves the HTTP API until a shutdown
//! signal arrives.
//!
//! # Lifecycle
//!
//! 1. Load and validate `vigil.toml` (environment overrides applied)
//! 2. Install the Prometheus recorder when `metrics.enabled`
//! 3. Build the orchestrator from the enabled collaborators
//! 4. Write the PID file, bind the API listener, serve
//! 5. On SIGTERM/SIGINT stop accepting connections, let in-flight
//!    pipeline requests finish, remove the PID file

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use vigil_collectors::orchestrator_from_config;
use vigil_core::config::VigilConfig;
use vigil_core::metrics as m;
use vigil_pipeline::{Orchestrator, RunRegistry};

use crate::api::{self, AppState};
use crate::metrics_server;
use crate::pid::PidFile;

/// Interval between uptime gauge updates.
const UPTIME_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// The assembled daemon.
pub struct Daemon {
    config: VigilConfig,
    orchestrator: Arc<Orchestrator>,
    state: AppState,
}

impl Daemon {
    /// Load configuration from `config_path` and build the daemon.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = VigilConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    pub fn build_from_config(config: VigilConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let registry = Arc::new(RunRegistry::new(config.pipeline.history_capacity));
        let orchestrator = orchestrator_from_config(&config, registry)
            .map_err(|e| anyhow::anyhow!("failed to build orchestrator: {}", e))?;
        let orchestrator = Arc::new(orchestrator);

        tracing::info!(
            stages = orchestrator.configured_stages(),
            history_capacity = config.pipeline.history_capacity,
            timeout_secs = config.pipeline.timeout_secs,
            "daemon initialized"
        );

        if config.metrics.enabled {
            record_daemon_metrics(orchestrator.configured_stages());
        }

        let state = AppState::new(Arc::clone(&orchestrator));
        Ok(Self {
            config,
            orchestrator,
            state,
        })
    }

    /// The HTTP router for this daemon.
    pub fn router(&self) -> Router {
        api::create_router(self.state.clone(), self.config.api.max_body_bytes)
    }

    /// Shared orchestrator.
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Loaded configuration.
    pub fn config(&self) -> &VigilConfig {
        &self.config
    }

    /// Serve the API on `listener` until `shutdown` resolves.
    ///
    /// Requests already in flight (including running pipelines) are
    /// allowed to finish.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "API listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("API server failed: {}", e))
    }

    /// Run until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<()> {
        let _pid_file = if self.config.general.pid_file.is_empty() {
            None
        } else {
            Some(PidFile::create(&self.config.general.pid_file)?)
        };

        let listener = TcpListener::bind(&self.config.api.bind)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", self.config.api.bind, e))?;

        let (shutdown_tx, _) = broadcast::channel::<()>(4);
        let uptime_task = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(Instant::now(), shutdown_tx.subscribe()));

        let notify = shutdown_tx.clone();
        let shutdown = async move {
            match wait_for_shutdown_signal().await {
                Ok(signal) => tracing::info!(signal, "shutdown signal received"),
                Err(e) => tracing::error!(error = %e, "signal handling failed, shutting down"),
            }
            let _ = notify.send(());
        };

        let result = self.serve(listener, shutdown).await;

        let _ = shutdown_tx.send(());
        if let Some(task) = uptime_task {
            let _ = task.await;
        }

        let registry = self.orchestrator.registry();
        tracing::info!(
            history = registry.history_len(),
            active = registry.active_count(),
            "vigil-daemon stopped"
        );
        result
    }
}

/// Wait for SIGTERM or SIGINT and return the signal name.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Record build info and the number of configured stage executors.
fn record_daemon_metrics(stage_count: usize) {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(m::DAEMON_STAGE_EXECUTORS_CONFIGURED).set(stage_count as f64);
}

/// Periodically refresh the uptime gauge until shutdown.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPTIME_UPDATE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}

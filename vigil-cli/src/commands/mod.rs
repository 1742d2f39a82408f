//! Command handlers -- one module per subcommand

pub mod config;
pub mod history;
pub mod run;
pub mod status;

use std::path::Path;

use vigil_core::config::{ApiConfig, VigilConfig};

/// Resolve the daemon base URL.
///
/// `--daemon-url` wins; otherwise the `api.bind` address of the config
/// file, falling back to the default bind when the file cannot be loaded.
pub async fn resolve_daemon_url(flag: Option<&str>, config_path: &Path) -> String {
    if let Some(url) = flag {
        return url.to_owned();
    }
    match VigilConfig::load(config_path).await {
        Ok(config) => config.api.bind,
        Err(e) => {
            tracing::debug!(error = %e, "config not usable, using default daemon address");
            ApiConfig::default().bind
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flag_wins() {
        let url = resolve_daemon_url(Some("http://10.0.0.5:9000"), Path::new("missing.toml")).await;
        assert_eq!(url, "http://10.0.0.5:9000");
    }

    #[tokio::test]
    async fn config_bind_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.toml");
        std::fs::write(&path, "[api]\nbind = \"127.0.0.1:9911\"\n").unwrap();

        let url = resolve_daemon_url(None, &path).await;

        assert_eq!(url, "127.0.0.1:9911");
    }

    #[tokio::test]
    async fn missing_config_falls_back_to_default_bind() {
        let url = resolve_daemon_url(None, Path::new("/nonexistent/vigil.toml")).await;
        assert_eq!(url, ApiConfig::default().bind);
    }
}

//! Student portal registration server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use portal_core::config::AppConfig;
use portal_metadata::InitOutcome;
use portal_server::{AppState, LoggingProvisioner, create_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Student portal registration server
#[derive(Parser, Debug)]
#[command(name = "portald")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "PORTAL_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from an optional TOML file overlaid with `PORTAL_` env vars.
fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();

    if config_path.exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!(
            config_path = %path,
            "No config file found, using defaults and environment variables"
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("PORTAL_").split("__").ignore(&["config"]))
        .extract()
        .context("failed to load configuration")?;

    let warnings = config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    for warning in warnings {
        tracing::warn!("Configuration warning: {}", warning);
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Startup banner
    tracing::info!("Portal v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    // Register Prometheus metrics
    portal_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    // Initialize counter store. PostgreSQL connects lazily, so an
    // unreachable database does not stop startup.
    let metadata = portal_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize counter store")?;
    tracing::info!("Counter store initialized");

    let state = AppState::new(config.clone(), metadata, Arc::new(LoggingProvisioner));

    match state.counter.initialize().await {
        InitOutcome::Deferred => {
            tracing::warn!("Counter not ready; requests will retry initialization")
        }
        outcome => tracing::info!(?outcome, "Counter ready"),
    }
    portal_server::metrics::observe_liveness(state.counter.is_live());

    // Create router
    let app = create_router(state);

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_config_from_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("server.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0:9090"
metrics_enabled = false

[metadata]
type = "sqlite"
path = "/var/lib/portal/portal.db"

[registration]
default_limit = 150
email_domain = "@uni.example.edu"

[auth]
member_trust_level = 2
admin_trust_level = 4
"#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9090");
        assert!(!config.server.metrics_enabled);
        assert_eq!(config.registration.default_limit, 150);
        assert_eq!(config.auth.member_trust_level, 2);
        assert_eq!(config.auth.admin_trust_level, 4);
    }

    #[test]
    fn load_config_rejects_invalid_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("server.toml");
        std::fs::write(
            &path,
            r#"
[auth]
member_trust_level = 5
admin_trust_level = 1
"#,
        )
        .unwrap();

        assert!(load_config(path.to_str().unwrap()).is_err());
    }
}

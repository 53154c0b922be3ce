use anyhow::{Context, Result};
use chback_api::shutdown::{install_signal_handlers, Shutdown};
use chback_api::ApiServer;
use chback_core::{init_logging_with_config, Backend, Config, LogConfig};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// chback HTTP API server
#[derive(Parser, Debug)]
#[command(name = "chback-api", version, about)]
struct Args {
    /// Config file (TOML); CHBACK_* environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_logging_with_config(LogConfig::from_settings(&config.logging)?)?;

    if config.metrics.enabled {
        PrometheusBuilder::new()
            .with_http_listener(config.metrics.bind_address)
            .install()
            .context("Failed to install Prometheus exporter")?;
        chback_core::metrics::init_metrics();
        info!(addr = %config.metrics.bind_address, "Serving metrics");
    }

    let backend = Arc::new(Backend::open(&config).context("Failed to open stores")?);

    let shutdown = Shutdown::new();
    install_signal_handlers(shutdown.clone());

    let server = ApiServer::bind(backend, &config.server)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    server.run(shutdown).await
}

//! Agro Dashboard CLI
//!
//! Command-line interface for the agricultural sensor dashboard.

use std::path::PathBuf;

use agro_dashboard::{load_config, Config, DashboardBuilder};
use clap::Parser;
use tracing::Level;

#[derive(Parser)]
#[command(name = "agro-dashboard")]
#[command(about = "Live dashboard and command relay for agricultural sensors")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base address (overrides AGRO_API_URL and the config file)
    #[arg(long)]
    api_url: Option<String>,

    /// Dashboard port (overrides config file)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, api_url={:?}, dashboard_port={:?}, log_level={:?}",
        args.config,
        args.api_url,
        args.dashboard_port,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    config.apply_env();
    config.override_api_url(args.api_url);

    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }

    tracing::info!("Starting agro dashboard for backend {}", config.base_url());
    tracing::debug!(
        "Subscriber enabled: {}, demo enabled: {}",
        config.subscriber.enabled,
        config.demo.enabled
    );

    DashboardBuilder::new(config).build().await?.start().await?;

    Ok(())
}

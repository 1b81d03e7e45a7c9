//! Folio portfolio tracker client - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Folio portfolio tracker client.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via FOLIO_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    folio_telemetry::init_logging()?;

    info!("Starting folio client v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > FOLIO_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("FOLIO_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = folio_client::AppConfig::from_file(&config_path)?;
    info!(
        backend_url = %config.backend_url,
        poll_interval_ms = config.poll_interval_ms,
        "Configuration loaded"
    );

    let app = folio_client::Application::new(config)?;
    app.run().await?;

    Ok(())
}

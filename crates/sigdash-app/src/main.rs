//! sigdash terminal client - Entry Point

use anyhow::Result;
use clap::Parser;
use sigdash_app::{AppConfig, Application};
use tracing::info;

/// Live trading-signal dashboard client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SIGDASH_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any wss:// connection)
    sigdash_ws::init_crypto();

    let args = Args::parse();

    // Determine config path: CLI arg > SIGDASH_CONFIG env var > default
    let (config_path, required) = AppConfig::resolve_path(args.config);
    let config = AppConfig::load(&config_path, required)?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    sigdash_telemetry::init_logging_with(&config.telemetry)?;

    info!("Starting sigdash v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        base_url = %config.base_url,
        ws_url = %config.ws_url,
        poll_interval_ms = config.sync.poll_interval_ms,
        "Configuration loaded"
    );

    let app = Application::new(config)?;
    app.run().await?;

    Ok(())
}

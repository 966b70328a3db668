//! Contact service: verified contact-form intake.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use service_gateway::config::{load_config, ContactServiceConfig, ProcessEnv};
use service_gateway::lifecycle::{shutdown_signal, start_contact_service};
use service_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "contact-service")]
#[command(about = "Contact-form submissions with bot verification and mail notification", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config: ContactServiceConfig = load_config(cli.config.as_deref(), &ProcessEnv)
        .context("invalid contact service configuration")?;
    logging::init(&config.observability, "contact_service");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let running = start_contact_service(&config)
        .await
        .context("contact service failed to start")?;
    running.run_until(shutdown_signal()).await?;
    Ok(())
}

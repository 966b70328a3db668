//! Auth service: user registration, login, token issuance.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use service_gateway::config::{load_config, AuthServiceConfig, ProcessEnv};
use service_gateway::lifecycle::{shutdown_signal, start_auth_service};
use service_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "auth-service")]
#[command(about = "User accounts and session tokens over gRPC and REST", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config: AuthServiceConfig = load_config(cli.config.as_deref(), &ProcessEnv)
        .context("invalid auth service configuration")?;
    logging::init(&config.observability, "auth_service");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let running = start_auth_service(&config)
        .await
        .context("auth service failed to start")?;
    running.run_until(shutdown_signal()).await?;
    Ok(())
}

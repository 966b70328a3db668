//! API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                   GATEWAY                    │
//!   Client Request     │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!   ───────────────────┼─▶│ layers   │──▶│ handler  │──▶│ rpc      │──┼──▶ auth / contact (gRPC)
//!                      │  │ id, cors │   │ decode   │   │ client   │  │
//!                      │  │ timeout  │   │ validate │   └──────────┘  │
//!                      │  └──────────┘   │ execute  │   ┌──────────┐  │
//!                      │                 │          │──▶│forwarder │──┼──▶ auth (HTTP register)
//!                      │                 └──────────┘   └──────────┘  │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use service_gateway::config::{load_config, GatewayConfig, ProcessEnv};
use service_gateway::lifecycle::{shutdown_signal, start_gateway};
use service_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "gateway")]
#[command(about = "Public HTTP gateway in front of the auth and contact services", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config: GatewayConfig =
        load_config(cli.config.as_deref(), &ProcessEnv).context("invalid gateway configuration")?;
    logging::init(&config.observability, "gateway");

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        auth_grpc = %config.backends.auth_grpc.address,
        contact_grpc = %config.backends.contact_grpc.address,
        auth_http = %config.backends.auth_http_base,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let running = start_gateway(&config).await.context("gateway failed to start")?;
    running.run_until(shutdown_signal()).await?;
    Ok(())
}

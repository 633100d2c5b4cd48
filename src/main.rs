use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

mod config;
mod context;
mod error;
mod keepalive;
mod ml;
mod web;

use crate::config::Config;
use crate::context::ServiceContext;
use crate::keepalive::PingScheduler;
use crate::web::ApiServer;

#[derive(Parser)]
#[command(name = "expensecast")]
#[command(about = "Expense forecasting and category classification service")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let port = cli.port.unwrap_or(config.server.port);

    info!("Starting expensecast service");

    // Artifacts load once here; handlers only ever read them
    let ctx = Arc::new(ServiceContext::initialize(&config));

    let keepalive = keepalive::start(&config.keepalive)?;

    let server = ApiServer::new(ctx);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.start(port).await {
            warn!("API server error: {}", e);
        }
    });

    // Wait for shutdown signal
    signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping services...");

    if let Some(scheduler) = keepalive {
        scheduler.shutdown();
    }
    server_handle.abort();

    Ok(())
}

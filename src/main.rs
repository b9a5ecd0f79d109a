//! # RosterWatch — background scraping scheduler
//!
//! Keeps esports player, team and tournament data fresh by queueing
//! rate-limited scrape tasks, and exposes a small admin API.
//!
//! Usage:
//!   rosterwatch                           # Config from ROSTERWATCH_CONFIG or ~/.rosterwatch/config.toml
//!   rosterwatch --config ./rw.toml        # Explicit config file
//!   rosterwatch --port 8080 -v            # Override admin port, debug logging

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use rosterwatch_core::RosterWatchConfig;
use rosterwatch_scheduler::Scheduler;
use rosterwatch_sources::BackendClient;

#[derive(Parser)]
#[command(
    name = "rosterwatch",
    version,
    about = "🎯 RosterWatch — rate-limited scraping scheduler"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    /// Admin API port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<RosterWatchConfig> {
    let config = match &cli.config {
        Some(p) => RosterWatchConfig::load_from(&PathBuf::from(shellexpand::tilde(p).to_string()))?,
        None => RosterWatchConfig::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "rosterwatch=debug,tower_http=debug"
    } else {
        "rosterwatch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = load_config(&cli)?;
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    let backend = Arc::new(BackendClient::new(&config.sources)?);
    tracing::info!("🔗 Host service API: {}", config.sources.base_url);

    let scheduler = Arc::new(Scheduler::new(
        config.scheduler.clone(),
        backend.clone(),
        backend.clone(),
        backend,
    )?);
    scheduler.init().await;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("🛑 Shutdown requested");
    };

    let served =
        rosterwatch_gateway::start(&config.gateway, Arc::clone(&scheduler), shutdown).await;
    scheduler.stop().await;
    served
}

//! Portal Socks - SOCKS5 tunnel agent
//!
//! This is the main entry point for the Portal Socks application.

use anyhow::{Context, Result};
use clap::Parser;
use portal_socks::agent::run_agent;
use portal_socks::config::{load_config, AgentConfig};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Portal Socks - SOCKS5 sessions multiplexed over one relay stream
#[derive(Parser, Debug)]
#[command(name = "portal-socks")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Relay endpoint (overrides the configuration file)
    #[arg(short, long)]
    relay_addr: Option<String>,

    /// Portal identifier (overrides the configuration file)
    #[arg(short, long)]
    portal_id: Option<i64>,

    /// Local SOCKS5 listen address (overrides the configuration file)
    #[arg(long)]
    listen_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    let config = build_config(&args)?;
    config.validate()?;

    info!("Portal Socks v{}", portal_socks::VERSION);
    if let Some(ref path) = args.config {
        info!("Configuration loaded from: {:?}", path);
    }
    info!("Relay: {}", config.relay_addr);
    info!("SOCKS5 listener: {}", config.listen_addr);

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    run_agent(config, shutdown).await
}

/// Merge the configuration file with command line overrides
fn build_config(args: &Args) -> Result<AgentConfig> {
    let mut config = match args.config {
        Some(ref path) => load_config(path)?.agent,
        None => {
            let relay_addr = args
                .relay_addr
                .clone()
                .context("--relay-addr is required without --config")?;
            let portal_id = args
                .portal_id
                .context("--portal-id is required without --config")?;
            AgentConfig::new(relay_addr, portal_id)
        }
    };

    if let Some(ref relay_addr) = args.relay_addr {
        config.relay_addr = relay_addr.clone();
    }
    if let Some(portal_id) = args.portal_id {
        config.portal_id = portal_id;
    }
    if let Some(ref listen_addr) = args.listen_addr {
        config.listen_addr = listen_addr.clone();
    }

    Ok(config)
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down...");
                    }
                }
            }
            Err(e) => {
                warn!("Failed to setup SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        // On Windows, only handle Ctrl+C
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down...");
    }

    shutdown.cancel();
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

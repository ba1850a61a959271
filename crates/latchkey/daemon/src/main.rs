//! Latchkey daemon
//!
//! Exchanges CI workload identity tokens for short-lived, repository
//! scoped access tokens, as allowed by each repository's access policy.

use anyhow::Context;
use clap::Parser;
use latchkey_daemon::{DaemonConfig, Profile, Server};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Latchkey daemon CLI
#[derive(Parser)]
#[command(name = "latchkeyd")]
#[command(about = "Latchkey - short-lived repository access tokens for CI workloads", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "LATCHKEY_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "LATCHKEY_LISTEN_ADDR")]
    listen: Option<SocketAddr>,

    /// Deployment profile (production, development)
    #[arg(short, long, env = "LATCHKEY_PROFILE")]
    profile: Option<Profile>,

    /// Log level
    #[arg(long, env = "LATCHKEY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "LATCHKEY_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration, then override with CLI args
    let mut config =
        DaemonConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    if let Some(profile) = cli.profile {
        config.profile = profile;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        issuer = %config.identity.issuer,
        policy_path = %config.policy.path,
        "Starting latchkeyd"
    );

    let server = Server::new(config).context("Failed to start server")?;
    server.run().await?;
    Ok(())
}

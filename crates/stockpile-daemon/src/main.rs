//! Stockpile Daemon - Main entry point
//!
//! Serves survey snapshots over a REST API and hosts the web viewer.

mod api;
mod auth;
mod config;
mod server;
mod state;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "stockpile")]
#[command(about = "Stockpile survey snapshot server")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "stockpile.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Stockpile v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;

    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    info!(
        surfaces = %config.surfaces.path,
        auth = config.auth.password.is_some(),
        "Configuration loaded"
    );

    let bind = config.daemon.bind.clone();
    let tls = config.daemon.tls.clone();
    let state = state::AppState::new(config);

    server::run(state, &bind, tls.as_ref()).await
}

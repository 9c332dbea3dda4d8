//! iarnetd — the IARNet-Global daemon.
//!
//! Single binary: loads the TOML config, installs tracing (console plus
//! the in-memory ring behind `GET /logs`), and runs the control plane
//! until ctrl-c.

mod bootstrap;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use iarnet_api::LogRing;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "iarnetd", about = "IARNet-Global cross-domain control plane")]
struct Cli {
    /// Path to the config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logs = LogRing::default();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,iarnetd=debug,iarnet=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(logs.layer())
        .init();

    let config = if cli.config.exists() {
        Config::from_file(&cli.config)?
    } else {
        tracing::warn!(path = %cli.config.display(), "config file not found, using defaults");
        let mut config = Config::default();
        config.apply_defaults();
        config
    };

    tracing::info!(
        http_port = config.http.port,
        rpc_port = config.rpc.port,
        data_dir = %config.data_dir,
        "iarnet-global starting"
    );

    bootstrap::run(config, logs).await
}

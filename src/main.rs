use crate::config::Config;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

mod api;
mod bedrock;
mod cmd;
mod config;
mod logs;
mod metrics;
mod tail;
mod wireguard;

use clap::{Parser, Subcommand};

/// vpsdash: read-only status API for a small self-hosted box
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the status API server
    Run {
        /// Path to the configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Validate configuration file
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Fetch every endpoint of a running instance and pretty-print it
    Show {
        /// API URL (default: http://127.0.0.1:8000)
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        api: String,
    },
}

const ENDPOINTS: [&str; 5] = [
    "/api/metrics",
    "/api/minecraft",
    "/api/vpn",
    "/api/owncloud/recent",
    "/api/backups/summary",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run {
        config: "config.toml".to_string(),
    }) {
        Commands::Run { config } => run_server(&config).await,
        Commands::Validate { config } => validate_config(&config),
        Commands::Show { api } => show_status(&api).await,
    }
}

fn validate_config(path: &str) -> anyhow::Result<()> {
    match Config::load(path) {
        Ok(cfg) => {
            info!("Configuration '{}' is valid.", path);
            info!("Listen: {}", cfg.listen);
            info!(
                "Bedrock: {}:{} (container '{}', timeout {}ms)",
                cfg.minecraft.host, cfg.minecraft.port, cfg.minecraft.container, cfg.minecraft.timeout_ms
            );
            info!("WireGuard interface: {}", cfg.wireguard.interface);
            info!("ownCloud log: {}", cfg.logs.owncloud_log.display());
            Ok(())
        }
        Err(e) => {
            error!("Configuration '{}' is INVALID: {}", path, e);
            Err(anyhow::anyhow!("Invalid config"))
        }
    }
}

async fn run_server(config_path: &str) -> anyhow::Result<()> {
    let config = if Path::new(config_path).exists() {
        Config::load(config_path)?
    } else {
        info!("No config at '{}', using built-in defaults", config_path);
        Config::default()
    };

    info!("Serving status API on {}", config.listen);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    let app = api::router(Arc::new(config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .expect("install SIGINT handler");
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

async fn show_status(api_url: &str) -> anyhow::Result<()> {
    for path in ENDPOINTS {
        match reqwest::get(format!("{}{}", api_url, path)).await {
            Ok(resp) => {
                let value = resp.json::<serde_json::Value>().await?;
                println!("# {}", path);
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            Err(e) => eprintln!("Failed to fetch {}: {}", path, e),
        }
    }
    Ok(())
}

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::bedrock::{self, BedrockStatus};
use crate::cmd;
use crate::config::Config;
use crate::logs::{self, BackupReport, LogEvent};
use crate::metrics::{self, MetricsSnapshot};
use crate::wireguard::{self, VpnStatus};

/// Budget for the docker state lookup.
const CMD_BUDGET: Duration = Duration::from_secs(2);

pub fn router(config: Arc<Config>) -> Router {
    Router::new()
        .route("/api/metrics", get(metrics_handler))
        .route("/api/minecraft", get(minecraft_handler))
        .route("/api/vpn", get(vpn_handler))
        .route("/api/owncloud/recent", get(owncloud_handler))
        .route("/api/backups/summary", get(backups_handler))
        .layer(CorsLayer::permissive())
        .with_state(config)
}

async fn metrics_handler() -> Json<MetricsSnapshot> {
    Json(metrics::capture().await)
}

#[derive(Debug, Serialize)]
struct MinecraftResponse {
    /// Docker state string (`running`, `exited`, ...), or `unknown` when
    /// docker itself cannot answer.
    container: String,
    server: BedrockStatus,
}

async fn minecraft_handler(State(config): State<Arc<Config>>) -> Json<MinecraftResponse> {
    let mc = &config.minecraft;
    let container = cmd::capture_stdout(
        "docker",
        &["inspect", "--format", "{{.State.Status}}", &mc.container],
        CMD_BUDGET,
    )
    .await
    .unwrap_or_else(|| "unknown".to_string());

    let mut server = bedrock::probe(&mc.host, mc.port, Duration::from_millis(mc.timeout_ms)).await;
    // The ping can be firewalled away while the container is healthy.
    if !server.online && container == "running" {
        server = BedrockStatus::assumed_online();
    }

    Json(MinecraftResponse { container, server })
}

async fn vpn_handler(State(config): State<Arc<Config>>) -> Json<VpnStatus> {
    Json(wireguard::collect(&config.wireguard.interface).await)
}

#[derive(Debug, Serialize)]
struct RecentEvents {
    events: Vec<LogEvent>,
}

async fn owncloud_handler(State(config): State<Arc<Config>>) -> Json<RecentEvents> {
    let events = logs::recent_events(&config.logs.owncloud_log, config.logs.max_lines);
    Json(RecentEvents { events })
}

async fn backups_handler(State(config): State<Arc<Config>>) -> Json<BackupReport> {
    Json(logs::backup_report(
        &config.logs.backup_summary,
        &config.logs.backup_history,
        config.logs.max_lines,
    ))
}

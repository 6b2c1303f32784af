//! Health check endpoint.

use axum::{extract::State, Json};
use futures::future::join_all;
use serde::Serialize;

use crate::server::AppState;
use crate::shard::ShardHealth;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage_backend: String,
    pub audit_enabled: bool,
    pub shards: Vec<ShardHealth>,
}

/// GET /health
///
/// Pings every shard so a lazily connected shard reports its real state.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let shards = state.router.shards();
    let pings = join_all(shards.iter().map(|shard| shard.ping())).await;

    for (shard, ping) in shards.iter().zip(&pings) {
        if let Err(e) = ping {
            tracing::warn!(shard = shard.index(), error = %e, "Shard health check failed");
        }
    }

    let shards = state.router.health();
    let status = if shards.iter().all(ShardHealth::is_healthy) {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        storage_backend: state.settings.storage.backend.clone(),
        audit_enabled: state.audit.is_enabled(),
        shards,
    })
}

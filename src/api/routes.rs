use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::{create_tag, delete_tag, get_tag, health, prometheus_metrics, publish, retrieve};

/// Tag administration and publishing
pub fn broker_routes() -> Router<AppState> {
    Router::new()
        .route("/tag", post(create_tag))
        .route("/tag/{name}", get(get_tag).delete(delete_tag))
        .route("/trans", post(publish))
}

/// Long-poll retrieval; any method pops
pub fn consumer_routes() -> Router<AppState> {
    Router::new().route("/{queue_id}", get(retrieve).post(retrieve))
}

pub fn operational_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
}

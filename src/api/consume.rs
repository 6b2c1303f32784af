//! Long-poll retrieval endpoint.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::error::Result;
use crate::server::AppState;
use crate::tenant::TenantScope;

#[derive(Debug, Deserialize)]
pub struct QueuePath {
    pub queue_id: String,
}

/// `/{queue_id}` - Wait for messages and answer their payloads, most recent
/// first. Answers `[]` when nothing arrives within the poll timeout.
#[tracing::instrument(name = "http.retrieve", skip_all, fields(queue = %path.queue_id))]
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(path): Path<QueuePath>,
) -> Result<Json<Vec<serde_json::Value>>> {
    let payloads = state
        .consumer
        .retrieve_payloads(&scope.scope(&path.queue_id))
        .await?;
    Ok(Json(payloads))
}

//! Tag administration endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::tag::{validate_tag, TagRecord};
use crate::tenant::TenantScope;

#[derive(Debug, Default, Deserialize)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub queues: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct TagOkResponse {
    pub ok: String,
}

#[derive(Debug, Deserialize)]
pub struct TagPath {
    pub name: String,
}

/// POST /tag - Create a tag or merge queues into it
#[tracing::instrument(name = "http.create_tag", skip_all, fields(tenant = scope.tenant()))]
pub async fn create_tag(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    body: std::result::Result<Json<CreateTagRequest>, JsonRejection>,
) -> Result<Json<TagOkResponse>> {
    let Json(request) = body.map_err(|e| AppError::validation(e.body_text()))?;
    let name = request.name.unwrap_or_default();
    let queues = request.queues.unwrap_or_default();

    // Validate the raw request: a scoped empty name is no longer empty
    validate_tag(&name, &queues)?;

    state
        .tags
        .create_or_merge_tag(&scope.scope(&name), &scope.scope_all(&queues))
        .await?;

    Ok(Json(TagOkResponse {
        ok: "tag stored".to_string(),
    }))
}

/// GET /tag/{name} - Current members of a tag
#[tracing::instrument(name = "http.get_tag", skip_all, fields(tag = %path.name))]
pub async fn get_tag(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(path): Path<TagPath>,
) -> Result<Json<TagRecord>> {
    let record = state.tags.read_tag(&scope.scope(&path.name)).await?;
    Ok(Json(record))
}

/// DELETE /tag/{name} - Remove a tag
#[tracing::instrument(name = "http.delete_tag", skip_all, fields(tag = %path.name))]
pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(path): Path<TagPath>,
) -> Result<Json<TagOkResponse>> {
    state.tags.delete_tag(&scope.scope(&path.name)).await?;

    Ok(Json(TagOkResponse {
        ok: format!("Tag {} removed", path.name),
    }))
}

//! Publish endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditEvent};
use crate::error::{AppError, Result};
use crate::metrics::PublishMetrics;
use crate::queue::{Message, Priority};
use crate::server::AppState;
use crate::tenant::TenantScope;

/// A target queue, given as `{"id": "..."}` or as a bare string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QueueRef {
    Object { id: String },
    Id(String),
}

impl QueueRef {
    pub fn id(&self) -> &str {
        match self {
            QueueRef::Object { id } | QueueRef::Id(id) => id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub callback: Option<String>,
    #[serde(default)]
    pub queue: Option<Vec<QueueRef>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl PublishRequest {
    /// Every problem with the request, in field order
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let has_payload = match &self.payload {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };
        if !has_payload {
            errors.push("missing payload".to_string());
        }

        if let Some(priority) = &self.priority {
            if Priority::parse(priority).is_none() {
                errors.push(format!("invalid priority '{}'", priority));
            }
        }

        let has_queue = self.queue.as_ref().is_some_and(|q| !q.is_empty());
        let has_tags = self.tags.as_ref().is_some_and(|t| !t.is_empty());
        if !has_queue && !has_tags {
            errors.push("missing queue or tags".to_string());
        }

        errors
    }

    pub fn queue_ids(&self) -> Vec<String> {
        self.queue
            .iter()
            .flatten()
            .map(|q| q.id().to_string())
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    /// Transaction id of this publish
    pub data: String,
    /// Every queue the message was appended to, in append order
    pub queues: Vec<String>,
}

/// POST /trans - Publish a message to queues and tags
#[tracing::instrument(name = "http.publish", skip_all, fields(tenant = scope.tenant()))]
pub async fn publish(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    body: std::result::Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Json<PublishResponse>> {
    let Json(request) = body.map_err(|e| AppError::validation(e.body_text()))?;

    let errors = request.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let explicit = scope.scope_all(&request.queue_ids());
    let tags = scope.scope_all(request.tags.as_deref().unwrap_or_default());
    let targets = state.fanout.resolve_targets(&explicit, &tags).await?;
    PublishMetrics::record_publish(targets.len());

    let priority = request
        .priority
        .as_deref()
        .and_then(Priority::parse)
        .unwrap_or_default();
    let message = Message::new(
        request.payload.unwrap_or_default(),
        priority,
        request.callback,
    );

    state.queues.enqueue_all(&targets, &message).await?;

    let transaction = Uuid::new_v4().to_string();
    state.audit.emit(AuditEvent::action_taken(
        AuditAction::Published,
        transaction.clone(),
        json!({ "queues": targets, "priority": priority }),
    ));
    tracing::info!(transaction = %transaction, targets = targets.len(), "Message published");

    Ok(Json(PublishResponse {
        data: transaction,
        queues: targets,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: serde_json::Value) -> PublishRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_queue_refs_accept_objects_and_strings() {
        let req = request(json!({"payload": "x", "queue": [{"id": "a"}, "b"]}));
        assert_eq!(req.queue_ids(), vec!["a", "b"]);
        assert!(req.validate().is_empty());
    }

    #[test]
    fn test_validation_collects_every_error() {
        let req = request(json!({"priority": "Z"}));
        assert_eq!(
            req.validate(),
            vec!["missing payload", "invalid priority 'Z'", "missing queue or tags"]
        );
    }

    #[test]
    fn test_tags_alone_are_a_target() {
        let req = request(json!({"payload": {"k": 1}, "tags": ["t"]}));
        assert!(req.validate().is_empty());
        assert!(req.queue_ids().is_empty());
    }

    #[test]
    fn test_empty_string_payload_is_missing() {
        let req = request(json!({"payload": "", "queue": ["a"]}));
        assert_eq!(req.validate(), vec!["missing payload"]);
    }
}

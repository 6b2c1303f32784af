use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::metrics::TagMetrics;
use crate::shard::{ShardError, ShardRouter};

#[derive(Debug, Error)]
pub enum TagError {
    #[error("Invalid tag: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Shard(#[from] ShardError),
}

/// A tag and its current members
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub name: String,
    pub queues: Vec<String>,
}

/// Check a tag definition, reporting every problem at once.
pub fn validate_tag(name: &str, members: &[String]) -> Result<(), TagError> {
    let mut errors = Vec::new();

    if name.is_empty() {
        errors.push("missing name".to_string());
    }
    if members.is_empty() {
        errors.push("missing queues".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TagError::Validation(errors))
    }
}

/// CRUD over tag membership sets.
///
/// Identifiers are taken as given; callers scope them to a tenant first.
pub struct TagRegistry {
    router: Arc<ShardRouter>,
    audit: AuditSink,
}

impl TagRegistry {
    pub fn new(router: Arc<ShardRouter>, audit: AuditSink) -> Self {
        Self { router, audit }
    }

    /// Union `members` into the tag `name`, creating it if needed.
    #[tracing::instrument(skip(self, members), fields(members = members.len()))]
    pub async fn create_or_merge_tag(&self, name: &str, members: &[String]) -> Result<(), TagError> {
        validate_tag(name, members)?;

        let key = self.router.tag_key(name);
        self.router.route(&key).add_to_set(&key, members).await?;

        TagMetrics::record_merge();
        self.audit.emit(AuditEvent::action_taken(
            AuditAction::TagMerged,
            name,
            json!({ "queues": members }),
        ));
        tracing::debug!(tag = %name, "Tag merged");
        Ok(())
    }

    /// Members of `name`. An absent tag reads as empty.
    pub async fn read_tag(&self, name: &str) -> Result<TagRecord, TagError> {
        let queues = self.members(name).await?;
        TagMetrics::record_read();

        Ok(TagRecord {
            name: name.to_string(),
            queues,
        })
    }

    /// Delete `name` entirely. Deleting an absent tag succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn delete_tag(&self, name: &str) -> Result<(), TagError> {
        let key = self.router.tag_key(name);
        self.router.route(&key).delete_key(&key).await?;

        TagMetrics::record_delete();
        self.audit.emit(AuditEvent::action_taken(
            AuditAction::TagDeleted,
            name,
            serde_json::Value::Null,
        ));
        Ok(())
    }

    /// Members of every tag in `names`, concatenated in `names` order.
    ///
    /// Lookups run concurrently; the first storage failure fails the whole
    /// resolution. Duplicates are kept.
    pub async fn resolve_tags(&self, names: &[String]) -> Result<Vec<String>, TagError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let per_tag = try_join_all(names.iter().map(|name| self.members(name))).await?;
        TagMetrics::record_resolve();

        Ok(per_tag.into_iter().flatten().collect())
    }

    async fn members(&self, name: &str) -> Result<Vec<String>, ShardError> {
        let key = self.router.tag_key(name);
        self.router.route(&key).read_set(&key).await
    }
}

//! Publish target resolution.

use std::sync::Arc;

use crate::tag::{TagError, TagRegistry};

/// Expands a publish request's explicit queues and tags into the final list
/// of target queues.
pub struct FanoutResolver {
    tags: Arc<TagRegistry>,
}

impl FanoutResolver {
    pub fn new(tags: Arc<TagRegistry>) -> Self {
        Self { tags }
    }

    /// Explicit queues first, then every tag's members in tag order.
    ///
    /// Nothing is deduplicated: a queue reached both explicitly and through a
    /// tag (or through two tags) is targeted once per occurrence.
    pub async fn resolve_targets(
        &self,
        explicit_queues: &[String],
        tags: &[String],
    ) -> Result<Vec<String>, TagError> {
        let mut targets = explicit_queues.to_vec();

        if !tags.is_empty() {
            targets.extend(self.tags.resolve_tags(tags).await?);
        }

        tracing::debug!(
            explicit = explicit_queues.len(),
            tags = tags.len(),
            targets = targets.len(),
            "Resolved publish targets"
        );
        Ok(targets)
    }
}

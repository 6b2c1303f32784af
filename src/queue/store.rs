use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use serde_json::json;
use thiserror::Error;

use crate::audit::{AuditEvent, AuditSink, MessageState};
use crate::metrics::PublishMetrics;
use crate::shard::{ShardError, ShardRouter};

use super::Message;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Shard(#[from] ShardError),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct QueueStore {
    router: Arc<ShardRouter>,
    audit: AuditSink,
}

impl QueueStore {
    pub fn new(router: Arc<ShardRouter>, audit: AuditSink) -> Self {
        Self { router, audit }
    }

    /// Append `message` to the tail of `queue_id`.
    pub async fn enqueue(&self, queue_id: &str, message: &Message) -> Result<(), QueueError> {
        let encoded = serde_json::to_string(message)?;
        let key = self.router.queue_key(queue_id);
        self.router.route(&key).append_to_list(&key, &encoded).await?;

        self.audit.emit(AuditEvent::state_changed(
            queue_id,
            MessageState::Pending,
            json!({ "message": message.id }),
        ));
        Ok(())
    }

    /// Append a copy of `message` to every target, concurrently.
    ///
    /// There is no cross-queue transaction: on failure some targets may
    /// already hold their copy.
    pub async fn enqueue_all(&self, targets: &[String], message: &Message) -> Result<usize, QueueError> {
        try_join_all(
            targets
                .iter()
                .map(|queue_id| async move { self.enqueue(queue_id, &message.copy_for_target()).await }),
        )
        .await?;

        PublishMetrics::record_appended(targets.len() as u64);
        Ok(targets.len())
    }

    /// Wait up to `timeout` for a first message, then drain whatever else is
    /// already queued (at most `max_batch` in total). Returned in FIFO order;
    /// an empty result is a normal outcome.
    ///
    /// Once the first message is popped it is always returned: a failed
    /// drain only shortens the batch, and the rest stays queued.
    pub async fn dequeue_blocking(
        &self,
        queue_id: &str,
        timeout: Duration,
        max_batch: usize,
    ) -> Result<Vec<Message>, QueueError> {
        let key = self.router.queue_key(queue_id);
        let shard = self.router.route(&key);

        let Some(first) = shard.blocking_pop_front(&key, timeout).await? else {
            return Ok(Vec::new());
        };

        let mut raw = vec![first];
        if max_batch > 1 {
            match shard.pop_front_batch(&key, max_batch - 1).await {
                Ok(rest) => raw.extend(rest),
                Err(e) => {
                    tracing::warn!(
                        queue = %queue_id,
                        shard = shard.index(),
                        error = %e,
                        "Drain after blocking pop failed, answering the first message only"
                    );
                }
            }
        }

        Ok(raw.iter().map(|value| Message::from_stored(value)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Priority;
    use crate::shard::{MemoryShardStore, ShardHandle, ShardHealth, ShardStore};
    use async_trait::async_trait;
    use serde_json::json;

    /// Memory shard whose non-blocking drain always fails
    struct BrokenDrainShard(MemoryShardStore);

    #[async_trait]
    impl ShardStore for BrokenDrainShard {
        fn index(&self) -> usize {
            self.0.index()
        }

        fn backend_type(&self) -> &'static str {
            self.0.backend_type()
        }

        async fn add_to_set(&self, name: &str, members: &[String]) -> Result<(), ShardError> {
            self.0.add_to_set(name, members).await
        }

        async fn read_set(&self, name: &str) -> Result<Vec<String>, ShardError> {
            self.0.read_set(name).await
        }

        async fn delete_key(&self, name: &str) -> Result<(), ShardError> {
            self.0.delete_key(name).await
        }

        async fn append_to_list(&self, name: &str, value: &str) -> Result<(), ShardError> {
            self.0.append_to_list(name, value).await
        }

        async fn blocking_pop_front(
            &self,
            name: &str,
            timeout: Duration,
        ) -> Result<Option<String>, ShardError> {
            self.0.blocking_pop_front(name, timeout).await
        }

        async fn pop_front_batch(&self, _name: &str, _max: usize) -> Result<Vec<String>, ShardError> {
            Err(ShardError::Unavailable {
                shard: self.0.index(),
                message: "connection reset".to_string(),
            })
        }

        async fn ping(&self) -> Result<(), ShardError> {
            self.0.ping().await
        }

        fn health(&self) -> ShardHealth {
            self.0.health()
        }
    }

    fn store() -> QueueStore {
        let shards = (0..4)
            .map(|i| Arc::new(MemoryShardStore::new(i)) as ShardHandle)
            .collect();
        QueueStore::new(Arc::new(ShardRouter::new(shards, "qb").unwrap()), AuditSink::disabled())
    }

    fn message(payload: &str) -> Message {
        Message::new(json!(payload), Priority::Low, None)
    }

    #[tokio::test]
    async fn test_dequeue_is_fifo_and_drains() {
        let queues = store();
        for p in ["1", "2", "3"] {
            queues.enqueue("q", &message(p)).await.unwrap();
        }

        let batch = queues
            .dequeue_blocking("q", Duration::from_millis(10), 100)
            .await
            .unwrap();
        let payloads: Vec<_> = batch.iter().map(|m| m.payload.clone()).collect();
        assert_eq!(payloads, vec![json!("1"), json!("2"), json!("3")]);

        let again = queues
            .dequeue_blocking("q", Duration::from_millis(10), 100)
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_dequeue_respects_max_batch() {
        let queues = store();
        for p in ["1", "2", "3"] {
            queues.enqueue("q", &message(p)).await.unwrap();
        }

        let batch = queues
            .dequeue_blocking("q", Duration::from_millis(10), 2)
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);

        let rest = queues
            .dequeue_blocking("q", Duration::from_millis(10), 1)
            .await
            .unwrap();
        assert_eq!(rest[0].payload, json!("3"));
    }

    #[tokio::test]
    async fn test_failed_drain_keeps_the_popped_message() {
        let shard = Arc::new(BrokenDrainShard(MemoryShardStore::new(0)));
        let router = ShardRouter::new(vec![shard.clone() as ShardHandle], "qb").unwrap();
        let queues = QueueStore::new(Arc::new(router), AuditSink::disabled());

        for p in ["1", "2"] {
            queues.enqueue("q", &message(p)).await.unwrap();
        }

        let batch = queues
            .dequeue_blocking("q", Duration::from_millis(10), 100)
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].payload, json!("1"));

        // The undrained message is still queued
        assert_eq!(shard.0.list_len("qb:queue:q"), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_times_out_empty() {
        let queues = store();
        let start = std::time::Instant::now();
        let batch = queues
            .dequeue_blocking("never", Duration::from_millis(100), 10)
            .await
            .unwrap();

        assert!(batch.is_empty());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_enqueue_all_gives_each_target_a_copy() {
        let queues = store();
        let original = message("hello");
        let appended = queues
            .enqueue_all(&["a".to_string(), "b".to_string(), "a".to_string()], &original)
            .await
            .unwrap();
        assert_eq!(appended, 3);

        let a = queues
            .dequeue_blocking("a", Duration::from_millis(10), 10)
            .await
            .unwrap();
        let b = queues
            .dequeue_blocking("b", Duration::from_millis(10), 10)
            .await
            .unwrap();

        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        assert_ne!(a[0].id, b[0].id);
        assert_ne!(a[0].id, original.id);
        assert_eq!(b[0].payload, json!("hello"));
    }
}

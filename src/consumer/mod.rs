//! Long-poll retrieval.
//!
//! A retrieval waits a bounded time for the first message on a queue, takes
//! everything else already queued and answers with the batch most recent
//! first. An empty answer after the wait is a success.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::audit::{AuditEvent, AuditSink, MessageState};
use crate::config::ConsumerConfig;
use crate::metrics::RetrievalMetrics;
use crate::queue::{Message, QueueError, QueueStore};

pub struct ConsumptionService {
    queues: Arc<QueueStore>,
    audit: AuditSink,
    timeout: Duration,
    max_batch: usize,
}

impl ConsumptionService {
    pub fn new(queues: Arc<QueueStore>, audit: AuditSink, config: &ConsumerConfig) -> Self {
        Self {
            queues,
            audit,
            timeout: Duration::from_millis(config.pop_timeout_ms),
            max_batch: config.max_batch.max(1),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pop pending messages from `queue_id`, most recently published first.
    #[tracing::instrument(skip(self))]
    pub async fn retrieve(&self, queue_id: &str) -> Result<Vec<Message>, QueueError> {
        let mut batch = self
            .queues
            .dequeue_blocking(queue_id, self.timeout, self.max_batch)
            .await?;
        batch.reverse();

        RetrievalMetrics::record(batch.len());
        for message in &batch {
            self.audit.emit(AuditEvent::state_changed(
                queue_id,
                MessageState::Delivered,
                json!({ "message": message.id }),
            ));
        }

        tracing::debug!(delivered = batch.len(), "Retrieval finished");
        Ok(batch)
    }

    /// Payloads of [`retrieve`](Self::retrieve), as answered to consumers
    pub async fn retrieve_payloads(&self, queue_id: &str) -> Result<Vec<serde_json::Value>, QueueError> {
        Ok(self
            .retrieve(queue_id)
            .await?
            .into_iter()
            .map(|m| m.payload)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Priority;
    use crate::shard::{MemoryShardStore, ShardHandle, ShardRouter};

    fn service(pop_timeout_ms: u64) -> (ConsumptionService, Arc<QueueStore>) {
        let shards = (0..2)
            .map(|i| Arc::new(MemoryShardStore::new(i)) as ShardHandle)
            .collect();
        let router = Arc::new(ShardRouter::new(shards, "qb").unwrap());
        let queues = Arc::new(QueueStore::new(router, AuditSink::disabled()));
        let config = ConsumerConfig {
            pop_timeout_ms,
            max_batch: 100,
        };
        (
            ConsumptionService::new(queues.clone(), AuditSink::disabled(), &config),
            queues,
        )
    }

    #[tokio::test]
    async fn test_most_recent_first() {
        let (consumer, queues) = service(50);
        for p in ["first", "second", "third"] {
            queues
                .enqueue("q", &Message::new(json!(p), Priority::Low, None))
                .await
                .unwrap();
        }

        let payloads = consumer.retrieve_payloads("q").await.unwrap();
        assert_eq!(payloads, vec![json!("third"), json!("second"), json!("first")]);
    }

    #[tokio::test]
    async fn test_empty_queue_answers_empty_after_timeout() {
        let (consumer, _) = service(1000);
        assert_eq!(consumer.timeout(), Duration::from_millis(1000));

        let start = std::time::Instant::now();
        let payloads = consumer.retrieve_payloads("empty").await.unwrap();
        let elapsed = start.elapsed();

        assert!(payloads.is_empty());
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_waiting_retrieval_sees_late_publish() {
        let (consumer, queues) = service(2000);
        let consumer = Arc::new(consumer);

        let waiter = {
            let consumer = consumer.clone();
            tokio::spawn(async move { consumer.retrieve_payloads("q").await.unwrap() })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        queues
            .enqueue("q", &Message::new(json!("late"), Priority::High, None))
            .await
            .unwrap();

        assert_eq!(waiter.await.unwrap(), vec![json!("late")]);
    }
}

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::metrics::AuditMetrics;

use super::{AuditEvent, AuditStore};

/// Non-blocking producer handle.
///
/// When the channel is full the new event is dropped and counted; queued
/// events are never displaced.
#[derive(Clone)]
pub struct AuditSink {
    tx: Option<mpsc::Sender<AuditEvent>>,
}

impl AuditSink {
    /// A sink that discards everything (audit disabled)
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Create a sink and the writer task persisting its events to `store`.
    pub fn spawn(
        store: Arc<dyn AuditStore>,
        capacity: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> (Self, AuditWriter) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let writer = AuditWriter::spawn(store, rx, shutdown);
        (Self { tx: Some(tx) }, writer)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue `event` without waiting.
    pub fn emit(&self, event: AuditEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                AuditMetrics::record_dropped();
                tracing::debug!(
                    kind = event.kind.as_str(),
                    name = %event.name,
                    "Audit channel full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                AuditMetrics::record_dropped();
            }
        }
    }
}

/// Background task draining the audit channel into the store
pub struct AuditWriter {
    handle: JoinHandle<()>,
}

impl AuditWriter {
    fn spawn(
        store: Arc<dyn AuditStore>,
        mut rx: mpsc::Receiver<AuditEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            tracing::info!(backend = store.backend_type(), "Audit writer started");

            loop {
                tokio::select! {
                    event = rx.recv() => match event {
                        Some(event) => persist(store.as_ref(), &event).await,
                        None => break,
                    },
                    _ = shutdown.recv() => {
                        tracing::info!("Audit writer received shutdown signal");
                        rx.close();
                        while let Some(event) = rx.recv().await {
                            persist(store.as_ref(), &event).await;
                        }
                        break;
                    }
                }
            }

            tracing::info!("Audit writer stopped");
        });

        Self { handle }
    }

    /// Wait for the writer to drain and exit
    pub async fn finish(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Audit writer task failed");
        }
    }
}

async fn persist(store: &dyn AuditStore, event: &AuditEvent) {
    match store.record(event).await {
        Ok(()) => AuditMetrics::record_recorded(),
        Err(e) => {
            AuditMetrics::record_failed();
            tracing::warn!(
                error = %e,
                event_id = %event.id,
                kind = event.kind.as_str(),
                "Failed to persist audit event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditAction, AuditError, MemoryAuditStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FailingStore {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl AuditStore for FailingStore {
        fn backend_type(&self) -> &'static str {
            "failing"
        }

        async fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(AuditError::Config("store offline".to_string()))
        }
    }

    fn event(subject: &str) -> AuditEvent {
        AuditEvent::action_taken(AuditAction::Published, subject, json!({}))
    }

    #[tokio::test]
    async fn test_events_reach_the_store() {
        let store = Arc::new(MemoryAuditStore::new());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (sink, writer) = AuditSink::spawn(store.clone(), 16, shutdown_rx);

        sink.emit(event("a"));
        sink.emit(event("b"));

        let _ = shutdown_tx.send(());
        writer.finish().await;

        let subjects: Vec<String> = store.events().await.into_iter().map(|e| e.subject).collect();
        assert_eq!(subjects, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_full_channel_drops_new_events() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = AuditSink { tx: Some(tx) };

        sink.emit(event("kept"));
        // Channel is full and nobody is reading; must return immediately
        tokio::time::timeout(Duration::from_millis(100), async { sink.emit(event("dropped")) })
            .await
            .unwrap();

        assert_eq!(rx.try_recv().unwrap().subject, "kept");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_store_failures_are_swallowed() {
        let store = Arc::new(FailingStore {
            attempts: AtomicUsize::new(0),
        });
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (sink, writer) = AuditSink::spawn(store.clone(), 16, shutdown_rx);

        sink.emit(event("a"));
        sink.emit(event("b"));
        let _ = shutdown_tx.send(());
        writer.finish().await;

        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
        // Emitting after the writer stopped is still harmless
        sink.emit(event("c"));
    }

    #[test]
    fn test_disabled_sink_discards() {
        let sink = AuditSink::disabled();
        assert!(!sink.is_enabled());
        sink.emit(event("ignored"));
    }
}

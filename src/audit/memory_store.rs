//! In-memory audit store for development and tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AuditError, AuditEvent, AuditKind, AuditStore};

#[derive(Default)]
pub struct MemoryAuditStore {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded event, oldest first
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }

    pub async fn events_of(&self, kind: AuditKind, name: &str) -> Vec<AuditEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.kind == kind && e.name == name)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}

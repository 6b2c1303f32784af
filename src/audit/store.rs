use async_trait::async_trait;
use thiserror::Error;

use super::AuditEvent;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid audit configuration: {0}")]
    Config(String),
}

/// Secondary store the audit writer persists to
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Backend identifier ("postgres", "memory")
    fn backend_type(&self) -> &'static str;

    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

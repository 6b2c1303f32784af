//! Audit store factory

use std::sync::Arc;

use crate::config::AuditConfig;

use super::memory_store::MemoryAuditStore;
use super::postgres_store::PostgresAuditStore;
use super::store::{AuditError, AuditStore};

/// Create the audit store selected by `config.backend`.
///
/// Returns `Ok(None)` when auditing is disabled. A store that cannot be set
/// up (database unreachable, table creation refused) is an error: audit
/// availability is a startup precondition.
pub async fn create_audit_store(
    config: &AuditConfig,
) -> Result<Option<Arc<dyn AuditStore>>, AuditError> {
    if !config.enabled {
        tracing::info!("Audit trail disabled");
        return Ok(None);
    }

    match config.backend.as_str() {
        "postgres" => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                AuditError::Config("audit.database_url is required".to_string())
            })?;
            let store = PostgresAuditStore::connect(url, &config.table, config.pool_size).await?;
            Ok(Some(Arc::new(store)))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory audit store");
            Ok(Some(Arc::new(MemoryAuditStore::new())))
        }
        other => Err(AuditError::Config(format!(
            "unknown audit backend '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_returns_none() {
        let store = create_audit_store(&AuditConfig::default()).await.unwrap();
        assert!(store.is_none());
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let config = AuditConfig {
            enabled: true,
            backend: "memory".to_string(),
            ..AuditConfig::default()
        };
        let store = create_audit_store(&config).await.unwrap().unwrap();
        assert_eq!(store.backend_type(), "memory");
    }

    #[tokio::test]
    async fn test_postgres_without_url_fails() {
        let config = AuditConfig {
            enabled: true,
            ..AuditConfig::default()
        };
        assert!(matches!(
            create_audit_store(&config).await,
            Err(AuditError::Config(_))
        ));
    }
}

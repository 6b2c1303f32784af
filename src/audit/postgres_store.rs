//! PostgreSQL audit store.
//!
//! Events land in a single append-only table created at startup:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS audit_events (
//!     id UUID PRIMARY KEY,
//!     kind TEXT NOT NULL,
//!     name TEXT NOT NULL,
//!     subject TEXT NOT NULL,
//!     detail JSONB NOT NULL,
//!     occurred_at TIMESTAMPTZ NOT NULL
//! )
//! ```

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::{AuditError, AuditEvent, AuditStore};

pub struct PostgresAuditStore {
    pool: PgPool,
    insert_sql: String,
}

impl PostgresAuditStore {
    /// Connect and make sure the audit table exists.
    pub async fn connect(url: &str, table: &str, pool_size: u32) -> Result<Self, AuditError> {
        validate_table_name(table)?;

        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;

        let store = Self::with_pool(pool, table)?;
        store.ensure_table(table).await?;

        tracing::info!(table = %table, pool_size, "PostgreSQL audit store ready");
        Ok(store)
    }

    pub fn with_pool(pool: PgPool, table: &str) -> Result<Self, AuditError> {
        validate_table_name(table)?;

        Ok(Self {
            pool,
            insert_sql: format!(
                "INSERT INTO {} (id, kind, name, subject, detail, occurred_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (id) DO NOTHING",
                table
            ),
        })
    }

    async fn ensure_table(&self, table: &str) -> Result<(), AuditError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id UUID PRIMARY KEY,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                subject TEXT NOT NULL,
                detail JSONB NOT NULL,
                occurred_at TIMESTAMPTZ NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_table_name(table: &str) -> Result<(), AuditError> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(AuditError::Config(format!("invalid audit table name '{}'", table)))
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        sqlx::query(&self.insert_sql)
            .bind(event.id)
            .bind(event.kind.as_str())
            .bind(&event.name)
            .bind(&event.subject)
            .bind(&event.detail)
            .bind(event.occurred_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

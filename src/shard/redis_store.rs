//! Redis-backed shard.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::redis::{PoolError, RedisPool};

use super::store::{ShardError, ShardHealth, ShardStore};

pub struct RedisShardStore {
    pool: Arc<RedisPool>,
}

impl RedisShardStore {
    pub fn new(pool: Arc<RedisPool>) -> Self {
        Self { pool }
    }

    fn map_error(&self, err: PoolError) -> ShardError {
        ShardError::from_pool(self.pool.shard(), err)
    }
}

#[async_trait]
impl ShardStore for RedisShardStore {
    fn index(&self) -> usize {
        self.pool.shard()
    }

    fn backend_type(&self) -> &'static str {
        "redis"
    }

    async fn add_to_set(&self, name: &str, members: &[String]) -> Result<(), ShardError> {
        if members.is_empty() {
            return Ok(());
        }

        let key = name.to_string();
        let members = members.to_vec();
        self.pool
            .execute(|mut conn| async move { conn.sadd::<_, _, ()>(key, members).await })
            .await
            .map_err(|e| self.map_error(e))
    }

    async fn read_set(&self, name: &str) -> Result<Vec<String>, ShardError> {
        let key = name.to_string();
        let mut members: Vec<String> = self
            .pool
            .execute(|mut conn| async move { conn.smembers(key).await })
            .await
            .map_err(|e| self.map_error(e))?;

        members.sort();
        Ok(members)
    }

    async fn delete_key(&self, name: &str) -> Result<(), ShardError> {
        let key = name.to_string();
        self.pool
            .execute(|mut conn| async move { conn.del::<_, ()>(key).await })
            .await
            .map_err(|e| self.map_error(e))
    }

    async fn append_to_list(&self, name: &str, value: &str) -> Result<(), ShardError> {
        let key = name.to_string();
        let value = value.to_string();
        self.pool
            .execute(|mut conn| async move { conn.rpush::<_, _, ()>(key, value).await })
            .await
            .map_err(|e| self.map_error(e))
    }

    async fn blocking_pop_front(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ShardError> {
        // BLPOP treats 0 as "block forever"
        if timeout.is_zero() {
            return Ok(self.pop_front_batch(name, 1).await?.into_iter().next());
        }

        let key = name.to_string();
        let seconds = timeout.as_secs_f64();
        let popped: Option<(String, String)> = self
            .pool
            .execute_blocking(|mut conn| async move {
                redis::cmd("BLPOP")
                    .arg(key)
                    .arg(seconds)
                    .query_async(&mut conn)
                    .await
            })
            .await
            .map_err(|e| self.map_error(e))?;

        Ok(popped.map(|(_, value)| value))
    }

    async fn pop_front_batch(&self, name: &str, max: usize) -> Result<Vec<String>, ShardError> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let key = name.to_string();
        let popped: Option<Vec<String>> = self
            .pool
            .execute(|mut conn| async move {
                redis::cmd("LPOP")
                    .arg(key)
                    .arg(max)
                    .query_async(&mut conn)
                    .await
            })
            .await
            .map_err(|e| self.map_error(e))?;

        Ok(popped.unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), ShardError> {
        self.pool.ping().await.map_err(|e| self.map_error(e))
    }

    fn health(&self) -> ShardHealth {
        ShardHealth {
            index: self.pool.shard(),
            backend: "redis",
            status: self.pool.health().status().as_str().to_string(),
            circuit: self.pool.circuit_state().as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redis::{CircuitBreaker, CircuitBreakerConfig, RedisHealth};

    fn store_with_open_circuit() -> RedisShardStore {
        let cb = Arc::new(CircuitBreaker::new(
            3,
            CircuitBreakerConfig {
                failure_threshold: 1,
                success_threshold: 1,
                reset_timeout_ms: 60_000,
            },
        ));
        cb.record_failure();
        let health = Arc::new(RedisHealth::new());
        let pool = RedisPool::new(3, "redis://localhost:6379", cb, health).unwrap();
        RedisShardStore::new(Arc::new(pool))
    }

    #[tokio::test]
    async fn test_open_circuit_surfaces_unavailable() {
        let store = store_with_open_circuit();

        let err = store.read_set("qb:tag:t").await.unwrap_err();
        assert!(matches!(err, ShardError::Unavailable { shard: 3, .. }));

        let err = store
            .blocking_pop_front("qb:queue:q", Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ShardError::Unavailable { shard: 3, .. }));
    }

    #[tokio::test]
    async fn test_empty_members_is_a_no_op() {
        let store = store_with_open_circuit();
        // Never reaches the (open) circuit
        assert!(store.add_to_set("qb:tag:t", &[]).await.is_ok());
        assert!(store.pop_front_batch("qb:queue:q", 0).await.unwrap().is_empty());
    }

    #[test]
    fn test_health_reports_circuit() {
        let store = store_with_open_circuit();
        let health = store.health();
        assert_eq!(health.index, 3);
        assert_eq!(health.backend, "redis");
        assert_eq!(health.circuit, "open");
        assert!(!health.is_healthy());
    }
}

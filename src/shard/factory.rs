//! Shard topology factory

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::redis::{CircuitBreaker, CircuitBreakerConfig, RedisHealth, RedisPool};

use super::memory_store::MemoryShardStore;
use super::redis_store::RedisShardStore;
use super::router::{ShardHandle, ShardRouter};
use super::store::ShardError;

/// Build the routing table from configuration.
///
/// `"redis"` creates one pool (with its own circuit breaker) per entry in
/// `storage.shards`; `"memory"` creates the same number of in-process shards.
/// Connections are opened lazily, so an unreachable shard does not prevent
/// startup.
pub fn create_shard_router(config: &StorageConfig) -> Result<ShardRouter, ShardError> {
    if config.shards.is_empty() {
        return Err(ShardError::Config("storage.shards is empty".to_string()));
    }

    let shards: Vec<ShardHandle> = match config.backend.as_str() {
        "redis" => {
            let breaker_config = CircuitBreakerConfig::from(config);
            let mut shards: Vec<ShardHandle> = Vec::with_capacity(config.shards.len());

            for (index, url) in config.shards.iter().enumerate() {
                let pool = RedisPool::new(
                    index,
                    url,
                    Arc::new(CircuitBreaker::new(index, breaker_config.clone())),
                    Arc::new(RedisHealth::new()),
                )
                .map_err(|e| ShardError::Config(format!("shard {}: {}", index, e)))?;

                shards.push(Arc::new(RedisShardStore::new(Arc::new(pool))));
            }

            tracing::info!(
                backend = "redis",
                shards = shards.len(),
                prefix = %config.key_prefix,
                "Created Redis shard topology"
            );
            shards
        }
        "memory" => {
            tracing::info!(
                backend = "memory",
                shards = config.shards.len(),
                "Created memory shard topology"
            );
            (0..config.shards.len())
                .map(|index| Arc::new(MemoryShardStore::new(index)) as ShardHandle)
                .collect()
        }
        other => {
            return Err(ShardError::Config(format!(
                "unknown storage backend '{}'",
                other
            )))
        }
    };

    ShardRouter::new(shards, config.key_prefix.clone())
}

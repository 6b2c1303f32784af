//! Primitive storage surface every shard exposes.
//!
//! Shards are opaque key-addressed stores holding sets (tag membership) and
//! lists (queue contents). All operations on one key run on one shard, so a
//! single-key mutation is atomic without cross-shard coordination.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::redis::PoolError;

#[derive(Debug, Error)]
pub enum ShardError {
    /// The shard could not be reached (connection refused, dropped, circuit open)
    #[error("Storage unavailable on shard {shard}: {message}")]
    Unavailable { shard: usize, message: String },

    /// The shard was reached but the command failed
    #[error("Storage error on shard {shard}: {message}")]
    Storage { shard: usize, message: String },

    #[error("Invalid storage configuration: {0}")]
    Config(String),
}

impl ShardError {
    pub fn from_pool(shard: usize, err: PoolError) -> Self {
        if err.is_unavailable() {
            ShardError::Unavailable {
                shard,
                message: err.to_string(),
            }
        } else {
            ShardError::Storage {
                shard,
                message: err.to_string(),
            }
        }
    }
}

/// Health snapshot of one shard
#[derive(Debug, Clone, Serialize)]
pub struct ShardHealth {
    pub index: usize,
    pub backend: &'static str,
    pub status: String,
    pub circuit: String,
}

impl ShardHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[async_trait]
pub trait ShardStore: Send + Sync {
    /// Position of this shard in the routing table
    fn index(&self) -> usize;

    /// Backend identifier ("redis", "memory")
    fn backend_type(&self) -> &'static str;

    /// Add members to the set at `name`, creating it if absent.
    async fn add_to_set(&self, name: &str, members: &[String]) -> Result<(), ShardError>;

    /// Read every member of the set at `name`. Absent keys read as empty.
    /// Members come back sorted.
    async fn read_set(&self, name: &str) -> Result<Vec<String>, ShardError>;

    /// Delete `name` whatever it holds. Deleting an absent key succeeds.
    async fn delete_key(&self, name: &str) -> Result<(), ShardError>;

    /// Append `value` to the tail of the list at `name`, creating it if absent.
    async fn append_to_list(&self, name: &str, value: &str) -> Result<(), ShardError>;

    /// Remove the head of the list at `name`, waiting up to `timeout` for one
    /// to arrive. `None` when the wait elapses with the list still empty.
    async fn blocking_pop_front(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ShardError>;

    /// Remove up to `max` elements from the head of the list without waiting.
    async fn pop_front_batch(&self, name: &str, max: usize) -> Result<Vec<String>, ShardError>;

    async fn ping(&self) -> Result<(), ShardError>;

    fn health(&self) -> ShardHealth;
}

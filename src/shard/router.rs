//! Key → shard routing.
//!
//! The routing table is fixed at startup. A key always hashes to the same
//! shard for the lifetime of the topology, which is what makes per-key set
//! and list mutations atomic.

use std::sync::Arc;

use super::store::{ShardError, ShardHealth, ShardStore};

pub type ShardHandle = Arc<dyn ShardStore>;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a_64(key: &str) -> u64 {
    key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Stable shard index for `key` among `shard_count` shards.
pub fn shard_index(key: &str, shard_count: usize) -> usize {
    (fnv1a_64(key) % shard_count as u64) as usize
}

pub struct ShardRouter {
    shards: Vec<ShardHandle>,
    key_prefix: String,
}

impl ShardRouter {
    pub fn new(shards: Vec<ShardHandle>, key_prefix: impl Into<String>) -> Result<Self, ShardError> {
        if shards.is_empty() {
            return Err(ShardError::Config(
                "at least one shard is required".to_string(),
            ));
        }

        Ok(Self {
            shards,
            key_prefix: key_prefix.into(),
        })
    }

    /// Shard owning `key`
    pub fn route(&self, key: &str) -> ShardHandle {
        self.shards[shard_index(key, self.shards.len())].clone()
    }

    /// Storage key of a tag's member set
    pub fn tag_key(&self, name: &str) -> String {
        format!("{}:tag:{}", self.key_prefix, name)
    }

    /// Storage key of a queue's message list
    pub fn queue_key(&self, queue_id: &str) -> String {
        format!("{}:queue:{}", self.key_prefix, queue_id)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shards(&self) -> &[ShardHandle] {
        &self.shards
    }

    pub fn health(&self) -> Vec<ShardHealth> {
        self.shards.iter().map(|s| s.health()).collect()
    }
}

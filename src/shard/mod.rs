//! Sharded key-value storage.
//!
//! Keys are routed to one of N shards by a stable hash. Each shard is either
//! a Redis instance or an in-memory store with identical semantics.

mod factory;
mod memory_store;
mod redis_store;
mod router;
mod store;

pub use factory::create_shard_router;
pub use memory_store::MemoryShardStore;
pub use redis_store::RedisShardStore;
pub use router::{shard_index, ShardHandle, ShardRouter};
pub use store::{ShardError, ShardHealth, ShardStore};

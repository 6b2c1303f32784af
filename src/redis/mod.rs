//! Redis storage infrastructure.
//!
//! - `CircuitBreaker`: fails commands fast while a shard is unreachable
//! - `RedisHealth`: connection health per shard
//! - `pool`: per-shard connection handling

mod circuit_breaker;
mod health;
pub mod pool;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use health::{RedisHealth, RedisHealthStatus};
pub use pool::{PoolError, RedisPool};

/// Current time in milliseconds since epoch
pub(crate) fn current_time_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

//! Redis connection pool for one storage shard.
//!
//! Ordinary commands share a single multiplexed connection. Blocking
//! commands (`BLPOP`) each run on a connection of their own: a parked blocking
//! command on the shared connection would stall every command queued behind
//! it on the same socket. Those dedicated connections are kept in a small
//! idle list and reused by later blocking calls.

use std::future::Future;
use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError, RedisResult};
use tokio::sync::{Mutex, RwLock};

use super::{CircuitBreaker, CircuitState, RedisHealth};

/// Error type for Redis pool operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Redis command failed
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    /// Circuit breaker is open
    #[error("Circuit breaker is open for shard {0}")]
    CircuitOpen(usize),

    /// Could not establish a connection
    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),
}

impl PoolError {
    /// Whether the error means the shard is unreachable rather than the
    /// command being rejected.
    pub fn is_unavailable(&self) -> bool {
        match self {
            PoolError::Redis(e) => e.is_connection_dropped() || e.is_io_error() || e.is_timeout(),
            PoolError::CircuitOpen(_) | PoolError::ConnectionUnavailable(_) => true,
        }
    }
}

/// Idle blocking connections kept per shard
const MAX_IDLE_BLOCKING: usize = 16;

pub struct RedisPool {
    shard: usize,
    client: Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    blocking_idle: Mutex<Vec<MultiplexedConnection>>,
    circuit_breaker: Arc<CircuitBreaker>,
    health: Arc<RedisHealth>,
    url: String,
}

impl RedisPool {
    /// Create a pool for `url`. No connection is opened until the first
    /// command.
    pub fn new(
        shard: usize,
        url: &str,
        circuit_breaker: Arc<CircuitBreaker>,
        health: Arc<RedisHealth>,
    ) -> Result<Self, PoolError> {
        let client = Client::open(url)?;

        Ok(Self {
            shard,
            client,
            connection: RwLock::new(None),
            blocking_idle: Mutex::new(Vec::new()),
            circuit_breaker,
            health,
            url: url.to_string(),
        })
    }

    /// Get the shared connection, establishing it if needed.
    pub async fn get_connection(&self) -> Result<MultiplexedConnection, PoolError> {
        self.check_circuit()?;

        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        self.connect().await
    }

    async fn connect(&self) -> Result<MultiplexedConnection, PoolError> {
        let mut conn_guard = self.connection.write().await;

        // Another task may have connected while we waited for the lock
        if let Some(ref c) = *conn_guard {
            return Ok(c.clone());
        }

        self.health.set_reconnecting();

        match self.client.get_multiplexed_tokio_connection().await {
            Ok(conn) => {
                *conn_guard = Some(conn.clone());
                self.circuit_breaker.record_success();
                self.health.set_connected();
                tracing::info!(shard = self.shard, url = %self.url, "Shard connection established");
                Ok(conn)
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                tracing::error!(shard = self.shard, error = %e, "Failed to connect to shard");
                Err(PoolError::ConnectionUnavailable(e.to_string()))
            }
        }
    }

    fn check_circuit(&self) -> Result<(), PoolError> {
        if !self.circuit_breaker.allow_request() {
            self.health.set_circuit_open();
            return Err(PoolError::CircuitOpen(self.shard));
        }
        Ok(())
    }

    /// Run a command on the shared connection with circuit breaker
    /// bookkeeping.
    pub async fn execute<F, T, Fut>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self.get_connection().await?;
        let result = f(conn).await;
        self.record(result).await
    }

    /// Run a blocking command on a dedicated connection.
    ///
    /// The connection is taken from the idle list, or opened when the list is
    /// empty. It goes back to the list only after a successful reply; a failed
    /// or cancelled command drops it.
    pub async fn execute_blocking<F, T, Fut>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        self.check_circuit()?;

        let idle = self.blocking_idle.lock().await.pop();
        let conn = match idle {
            Some(conn) => conn,
            None => match self.client.get_multiplexed_tokio_connection().await {
                Ok(conn) => conn,
                Err(e) => {
                    self.circuit_breaker.record_failure();
                    self.health.set_reconnecting();
                    return Err(PoolError::ConnectionUnavailable(e.to_string()));
                }
            },
        };

        let result = f(conn.clone()).await;
        if result.is_ok() {
            let mut idle = self.blocking_idle.lock().await;
            if idle.len() < MAX_IDLE_BLOCKING {
                idle.push(conn);
            }
        }
        self.record(result).await
    }

    /// Dedicated blocking connections currently waiting for reuse
    pub async fn idle_blocking_connections(&self) -> usize {
        self.blocking_idle.lock().await.len()
    }

    async fn record<T>(&self, result: RedisResult<T>) -> Result<T, PoolError> {
        match result {
            Ok(value) => {
                self.circuit_breaker.record_success();
                if !self.health.is_healthy() {
                    self.health.set_connected();
                }
                Ok(value)
            }
            Err(e) => {
                if e.is_connection_dropped() || e.is_io_error() {
                    // Force a reconnect on the next command
                    let mut conn_guard = self.connection.write().await;
                    *conn_guard = None;
                    self.health.set_reconnecting();
                }
                self.circuit_breaker.record_failure();
                Err(PoolError::Redis(e))
            }
        }
    }

    pub async fn ping(&self) -> Result<(), PoolError> {
        self.execute(|mut conn| async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    pub fn shard(&self) -> usize {
        self.shard
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy() && self.circuit_breaker.state() == CircuitState::Closed
    }

    pub fn health(&self) -> &RedisHealth {
        &self.health
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }
}

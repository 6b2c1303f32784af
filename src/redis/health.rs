//! Connection health tracking for a storage shard

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU8, Ordering};

use serde::Serialize;

use super::current_time_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedisHealthStatus {
    Healthy,
    /// No connection yet, or the last one dropped
    Reconnecting,
    /// Commands are being rejected by the circuit breaker
    CircuitOpen,
}

impl RedisHealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedisHealthStatus::Healthy => "healthy",
            RedisHealthStatus::Reconnecting => "reconnecting",
            RedisHealthStatus::CircuitOpen => "circuit_open",
        }
    }
}

pub struct RedisHealth {
    status: AtomicU8,
    last_connected: AtomicI64,
    total_reconnections: AtomicU32,
}

impl RedisHealth {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(RedisHealthStatus::Reconnecting as u8),
            last_connected: AtomicI64::new(0),
            total_reconnections: AtomicU32::new(0),
        }
    }

    pub fn set_connected(&self) {
        let previous = self
            .status
            .swap(RedisHealthStatus::Healthy as u8, Ordering::AcqRel);
        let connected_before = self
            .last_connected
            .swap(current_time_ms(), Ordering::AcqRel)
            > 0;
        if previous != RedisHealthStatus::Healthy as u8 && connected_before {
            self.total_reconnections.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn set_reconnecting(&self) {
        self.status
            .store(RedisHealthStatus::Reconnecting as u8, Ordering::Release);
    }

    pub fn set_circuit_open(&self) {
        self.status
            .store(RedisHealthStatus::CircuitOpen as u8, Ordering::Release);
    }

    pub fn status(&self) -> RedisHealthStatus {
        match self.status.load(Ordering::Acquire) {
            0 => RedisHealthStatus::Healthy,
            2 => RedisHealthStatus::CircuitOpen,
            _ => RedisHealthStatus::Reconnecting,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status() == RedisHealthStatus::Healthy
    }

    pub fn last_connected_ms(&self) -> i64 {
        self.last_connected.load(Ordering::Acquire)
    }

    pub fn total_reconnections(&self) -> u32 {
        self.total_reconnections.load(Ordering::Acquire)
    }
}

impl Default for RedisHealth {
    fn default() -> Self {
        Self::new()
    }
}

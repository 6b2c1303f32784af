//! Prometheus metrics for the queue broker.
//!
//! - Publish metrics (requests, fan-out width, appended messages)
//! - Tag metrics (create/read/delete)
//! - Retrieval metrics (long-polls that returned data vs. timed out empty)
//! - Storage metrics (errors per shard, circuit breaker state)
//! - Audit metrics (recorded, dropped on overflow, failed persistence)

mod helpers;

pub use helpers::{encode_metrics, AuditMetrics, PublishMetrics, RetrievalMetrics, StorageMetrics, TagMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge_vec,
    Histogram, IntCounter, IntCounterVec, IntGaugeVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "qb";

lazy_static! {
    // ============================================================================
    // Publish Metrics
    // ============================================================================

    /// Total publish requests accepted
    pub static ref PUBLISH_REQUESTS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_publish_requests_total", METRIC_PREFIX),
        "Total publish requests accepted"
    ).unwrap();

    /// Total messages appended to queues (one per resolved target)
    pub static ref MESSAGES_APPENDED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_appended_total", METRIC_PREFIX),
        "Total messages appended to queues"
    ).unwrap();

    /// Number of resolved targets per publish
    pub static ref FANOUT_WIDTH: Histogram = register_histogram!(
        format!("{}_fanout_width", METRIC_PREFIX),
        "Number of queues a single publish was fanned out to",
        vec![1.0, 2.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0]
    ).unwrap();

    // ============================================================================
    // Tag Metrics
    // ============================================================================

    /// Tag operations by kind
    pub static ref TAG_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_tag_operations_total", METRIC_PREFIX),
        "Tag operations",
        &["operation"]
    ).unwrap();

    // ============================================================================
    // Retrieval Metrics
    // ============================================================================

    /// Long-poll retrievals by outcome (messages / empty)
    pub static ref RETRIEVALS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_retrievals_total", METRIC_PREFIX),
        "Long-poll retrievals by outcome",
        &["outcome"]
    ).unwrap();

    /// Messages handed to consumers
    pub static ref MESSAGES_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_delivered_total", METRIC_PREFIX),
        "Total messages returned to consumers"
    ).unwrap();

    // ============================================================================
    // Storage Metrics
    // ============================================================================

    /// Storage errors per shard
    pub static ref STORAGE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_storage_errors_total", METRIC_PREFIX),
        "Storage errors per shard",
        &["shard"]
    ).unwrap();

    /// Circuit breaker state per shard (0=closed, 1=open, 2=half-open)
    pub static ref SHARD_CIRCUIT_STATE: IntGaugeVec = register_int_gauge_vec!(
        format!("{}_shard_circuit_state", METRIC_PREFIX),
        "Shard circuit breaker state (0=closed, 1=open, 2=half-open)",
        &["shard"]
    ).unwrap();

    // ============================================================================
    // Audit Metrics
    // ============================================================================

    /// Audit events persisted
    pub static ref AUDIT_RECORDED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_audit_recorded_total", METRIC_PREFIX),
        "Audit events persisted to the secondary store"
    ).unwrap();

    /// Audit events dropped because the channel was full
    pub static ref AUDIT_DROPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_audit_dropped_total", METRIC_PREFIX),
        "Audit events dropped on channel overflow"
    ).unwrap();

    /// Audit events whose persistence failed
    pub static ref AUDIT_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_audit_failed_total", METRIC_PREFIX),
        "Audit events that failed to persist"
    ).unwrap();
}

//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    AUDIT_DROPPED_TOTAL, AUDIT_FAILED_TOTAL, AUDIT_RECORDED_TOTAL, FANOUT_WIDTH,
    MESSAGES_APPENDED_TOTAL, MESSAGES_DELIVERED_TOTAL, PUBLISH_REQUESTS_TOTAL, RETRIEVALS_TOTAL,
    SHARD_CIRCUIT_STATE, STORAGE_ERRORS_TOTAL, TAG_OPERATIONS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording publish metrics
pub struct PublishMetrics;

impl PublishMetrics {
    /// Record an accepted publish and the number of queues it fanned out to
    pub fn record_publish(targets: usize) {
        PUBLISH_REQUESTS_TOTAL.inc();
        FANOUT_WIDTH.observe(targets as f64);
    }

    /// Record messages appended to queues
    pub fn record_appended(count: u64) {
        MESSAGES_APPENDED_TOTAL.inc_by(count);
    }
}

/// Helper struct for recording tag metrics
pub struct TagMetrics;

impl TagMetrics {
    pub fn record_merge() {
        TAG_OPERATIONS_TOTAL.with_label_values(&["merge"]).inc();
    }

    pub fn record_read() {
        TAG_OPERATIONS_TOTAL.with_label_values(&["read"]).inc();
    }

    pub fn record_delete() {
        TAG_OPERATIONS_TOTAL.with_label_values(&["delete"]).inc();
    }

    pub fn record_resolve() {
        TAG_OPERATIONS_TOTAL.with_label_values(&["resolve"]).inc();
    }
}

/// Helper struct for recording long-poll retrieval metrics
pub struct RetrievalMetrics;

impl RetrievalMetrics {
    /// Record a retrieval and how many messages it returned
    pub fn record(delivered: usize) {
        if delivered == 0 {
            RETRIEVALS_TOTAL.with_label_values(&["empty"]).inc();
        } else {
            RETRIEVALS_TOTAL.with_label_values(&["messages"]).inc();
            MESSAGES_DELIVERED_TOTAL.inc_by(delivered as u64);
        }
    }
}

/// Helper struct for recording storage metrics
pub struct StorageMetrics;

impl StorageMetrics {
    pub fn record_error(shard: usize) {
        STORAGE_ERRORS_TOTAL
            .with_label_values(&[&shard.to_string()])
            .inc();
    }

    pub fn set_circuit_state(shard: usize, state: u8) {
        SHARD_CIRCUIT_STATE
            .with_label_values(&[&shard.to_string()])
            .set(state as i64);
    }
}

/// Helper struct for recording audit metrics
pub struct AuditMetrics;

impl AuditMetrics {
    pub fn record_recorded() {
        AUDIT_RECORDED_TOTAL.inc();
    }

    pub fn record_dropped() {
        AUDIT_DROPPED_TOTAL.inc();
    }

    pub fn record_failed() {
        AUDIT_FAILED_TOTAL.inc();
    }
}

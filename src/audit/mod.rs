//! Best-effort audit trail of broker lifecycle events.
//!
//! Producers hand events to an [`AuditSink`], which never waits: the event is
//! queued on a bounded channel or dropped. A background [`AuditWriter`]
//! persists queued events to an [`AuditStore`]. Persistence failures are
//! logged and never reach the request path.

mod event;
mod factory;
mod memory_store;
mod postgres_store;
mod sink;
mod store;

pub use event::{AuditAction, AuditEvent, AuditKind, MessageState};
pub use factory::create_audit_store;
pub use memory_store::MemoryAuditStore;
pub use postgres_store::PostgresAuditStore;
pub use sink::{AuditSink, AuditWriter};
pub use store::{AuditError, AuditStore};

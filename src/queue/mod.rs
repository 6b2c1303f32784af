//! Per-queue FIFO storage.
//!
//! Queues are created by their first append and never deleted here; a queue
//! that was never written to is simply empty.

mod message;
mod store;

pub use message::{Message, Priority};
pub use store::{QueueError, QueueStore};

//! Tags: named, mutable sets of queue ids used to fan one publish out to
//! many queues.

mod registry;

pub use registry::{validate_tag, TagError, TagRecord, TagRegistry};

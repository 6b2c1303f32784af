// Infrastructure layer (shared components)
pub mod config;
pub mod error;
pub mod metrics;
pub mod redis;
pub mod shard;

// Domain layer (broker logic)
pub mod audit;
pub mod consumer;
pub mod fanout;
pub mod queue;
pub mod tag;
pub mod tenant;

// Application layer
pub mod api;
pub mod server;

// Supporting modules
pub mod telemetry;

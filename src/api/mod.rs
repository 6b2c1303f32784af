//! API layer - HTTP endpoint handlers organized by domain.

mod consume;
mod health;
mod metrics;
mod publish;
mod routes;
mod tag;

pub use consume::retrieve;
pub use health::health;
pub use metrics::prometheus_metrics;
pub use publish::{publish, PublishRequest, PublishResponse, QueueRef};
pub use routes::{broker_routes, consumer_routes, operational_routes};
pub use tag::{create_tag, delete_tag, get_tag, CreateTagRequest, TagOkResponse};

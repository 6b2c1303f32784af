use std::sync::Arc;
use std::time::Instant;

use crate::audit::AuditSink;
use crate::config::Settings;
use crate::consumer::ConsumptionService;
use crate::fanout::FanoutResolver;
use crate::queue::QueueStore;
use crate::shard::{create_shard_router, ShardError, ShardRouter};
use crate::tag::TagRegistry;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub router: Arc<ShardRouter>,
    pub tags: Arc<TagRegistry>,
    pub fanout: Arc<FanoutResolver>,
    pub queues: Arc<QueueStore>,
    pub consumer: Arc<ConsumptionService>,
    pub audit: AuditSink,
    pub start_time: Instant,
}

impl AppState {
    /// Wire every component over an existing shard topology.
    pub fn new(settings: Settings, router: ShardRouter, audit: AuditSink) -> Self {
        let router = Arc::new(router);
        let tags = Arc::new(TagRegistry::new(router.clone(), audit.clone()));
        let fanout = Arc::new(FanoutResolver::new(tags.clone()));
        let queues = Arc::new(QueueStore::new(router.clone(), audit.clone()));
        let consumer = Arc::new(ConsumptionService::new(
            queues.clone(),
            audit.clone(),
            &settings.consumer,
        ));

        Self {
            settings: Arc::new(settings),
            router,
            tags,
            fanout,
            queues,
            consumer,
            audit,
            start_time: Instant::now(),
        }
    }

    /// Build the shard topology described by `settings.storage`, then wire.
    pub fn from_settings(settings: Settings, audit: AuditSink) -> Result<Self, ShardError> {
        let router = create_shard_router(&settings.storage)?;
        Ok(Self::new(settings, router, audit))
    }
}

mod settings;

pub use settings::{
    AuditConfig, ConsumerConfig, LoggingConfig, OtelConfig, ServerConfig, Settings, StorageConfig, TenantConfig,
};

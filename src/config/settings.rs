use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tenant: TenantConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub otel: OtelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Port for the publisher / tag administration API
    #[serde(default = "default_port")]
    pub port: u16,
    /// Port for the long-poll retrieval listener
    #[serde(default = "default_consumer_port")]
    pub consumer_port: u16,
    /// Maximum accepted request body size
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// "redis" or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Ordered shard URLs. The order defines shard indices.
    #[serde(default = "default_shards")]
    pub shards: Vec<String>,
    /// Prefix for every storage key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_cb_failure_threshold")]
    pub circuit_breaker_failure_threshold: u32,
    #[serde(default = "default_cb_success_threshold")]
    pub circuit_breaker_success_threshold: u32,
    #[serde(default = "default_cb_reset_timeout")]
    pub circuit_breaker_reset_timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantConfig {
    /// Header carrying the tenant id. When unset, the tenant comes from the
    /// `id_org` path segment.
    #[serde(default)]
    pub header: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerConfig {
    /// How long a retrieval waits for the first message
    #[serde(default = "default_pop_timeout_ms")]
    pub pop_timeout_ms: u64,
    /// Upper bound on messages returned by one retrieval
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "postgres" or "memory"
    #[serde(default = "default_audit_backend")]
    pub backend: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_audit_table")]
    pub table: String,
    #[serde(default = "default_audit_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_audit_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_consumer_port() -> u16 {
    3003
}

fn default_body_limit() -> usize {
    1024 * 1024
}

fn default_storage_backend() -> String {
    "redis".to_string()
}

fn default_shards() -> Vec<String> {
    vec!["redis://localhost:6379".to_string()]
}

fn default_key_prefix() -> String {
    "qb".to_string()
}

fn default_cb_failure_threshold() -> u32 {
    5
}

fn default_cb_success_threshold() -> u32 {
    2
}

fn default_cb_reset_timeout() -> u64 {
    30
}

fn default_pop_timeout_ms() -> u64 {
    1000
}

fn default_max_batch() -> usize {
    100
}

fn default_audit_backend() -> String {
    "postgres".to_string()
}

fn default_audit_table() -> String {
    "audit_events".to_string()
}

fn default_audit_capacity() -> usize {
    1024
}

fn default_audit_pool_size() -> u32 {
    5
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "queue-broker-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        Self::load(Self::environment())
    }

    /// Environment source: `QB_` prefix, `__` between section and field so
    /// snake_case fields keep their underscores.
    ///
    /// QB_STORAGE__SHARDS=redis://a:6379,redis://b:6379
    /// QB_CONSUMER__POP_TIMEOUT_MS=500
    /// QB_TENANT__HEADER=x-org-id
    fn environment() -> Environment {
        Environment::with_prefix("QB")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("storage.shards")
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("server.consumer_port", default_consumer_port())?
            .set_default("storage.backend", default_storage_backend())?
            .set_default("storage.shards", default_shards())?
            .set_default("consumer.pop_timeout_ms", default_pop_timeout_ms())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(environment);

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.shards.is_empty() {
            return Err(ConfigError::Message(
                "storage.shards must list at least one shard".to_string(),
            ));
        }
        if self.audit.enabled
            && self.audit.backend == "postgres"
            && self.audit.database_url.is_none()
        {
            return Err(ConfigError::Message(
                "audit.database_url is required for the postgres audit backend".to_string(),
            ));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn consumer_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.consumer_port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            tenant: TenantConfig::default(),
            consumer: ConsumerConfig::default(),
            audit: AuditConfig::default(),
            otel: OtelConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            consumer_port: default_consumer_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            shards: default_shards(),
            key_prefix: default_key_prefix(),
            circuit_breaker_failure_threshold: default_cb_failure_threshold(),
            circuit_breaker_success_threshold: default_cb_success_threshold(),
            circuit_breaker_reset_timeout_seconds: default_cb_reset_timeout(),
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            pop_timeout_ms: default_pop_timeout_ms(),
            max_batch: default_max_batch(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: default_audit_backend(),
            database_url: None,
            table: default_audit_table(),
            channel_capacity: default_audit_capacity(),
            pool_size: default_audit_pool_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

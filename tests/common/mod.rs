//! Shared setup for HTTP-level tests: both routers over in-memory shards
//! and an in-memory audit store.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::sync::broadcast;
use tower::ServiceExt;

use queue_broker_service::audit::{AuditSink, AuditWriter, MemoryAuditStore};
use queue_broker_service::config::Settings;
use queue_broker_service::server::{create_app, create_consumer_app, AppState};

pub struct TestBroker {
    pub app: Router,
    pub consumer: Router,
    pub audit: Arc<MemoryAuditStore>,
    shutdown: broadcast::Sender<()>,
    writer: AuditWriter,
}

impl TestBroker {
    pub fn new(tenant_header: Option<&str>) -> Self {
        let mut settings = Settings::default();
        settings.storage.backend = "memory".to_string();
        settings.storage.shards = vec!["s0".into(), "s1".into(), "s2".into()];
        settings.tenant.header = tenant_header.map(str::to_string);
        settings.consumer.pop_timeout_ms = 200;

        let audit = Arc::new(MemoryAuditStore::new());
        let (shutdown, _) = broadcast::channel(1);
        let (sink, writer) = AuditSink::spawn(audit.clone(), 1024, shutdown.subscribe());

        let state = AppState::from_settings(settings, sink).unwrap();

        Self {
            app: create_app(state.clone()),
            consumer: create_consumer_app(state),
            audit,
            shutdown,
            writer,
        }
    }

    /// Stop the audit writer once everything queued is persisted
    pub async fn flush_audit(self) -> Arc<MemoryAuditStore> {
        let _ = self.shutdown.send(());
        self.writer.finish().await;
        self.audit
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

pub fn json_request(method: &str, uri: &str, tenant: Option<(&str, &str)>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some((name, value)) = tenant {
        builder = builder.header(name, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, tenant: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((name, value)) = tenant {
        builder = builder.header(name, value);
    }
    builder.body(Body::empty()).unwrap()
}

use std::future::IntoFuture;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use queue_broker_service::audit::{create_audit_store, AuditSink};
use queue_broker_service::config::Settings;
use queue_broker_service::server::{create_app, create_consumer_app, AppState};
use queue_broker_service::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing (kept alive until exit)
    let _telemetry = init_telemetry(&settings.logging, &settings.otel)?;
    tracing::info!("Configuration loaded");

    // Audit store setup failures abort startup
    let (audit_shutdown_tx, _) = broadcast::channel::<()>(1);
    let (audit, audit_writer) = match create_audit_store(&settings.audit).await? {
        Some(store) => {
            let (sink, writer) = AuditSink::spawn(
                store,
                settings.audit.channel_capacity,
                audit_shutdown_tx.subscribe(),
            );
            (sink, Some(writer))
        }
        None => (AuditSink::disabled(), None),
    };

    let state = AppState::from_settings(settings.clone(), audit)?;
    tracing::info!(
        backend = %settings.storage.backend,
        shards = state.router.shard_count(),
        tenant_header = ?settings.tenant.header,
        "Application state initialized"
    );

    let app = create_app(state.clone());
    let consumer_app = create_consumer_app(state);

    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Broker API listening on {}", addr);

    let consumer_addr = settings.consumer_addr();
    let consumer_listener = TcpListener::bind(&consumer_addr).await?;
    tracing::info!("Consumer listening on {}", consumer_addr);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let broker = axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_tx.subscribe()));
    let consumer = axum::serve(consumer_listener, consumer_app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_tx.subscribe()));

    tokio::spawn(shutdown_signal_handler(shutdown_tx));

    let (broker_result, consumer_result) =
        tokio::join!(broker.into_future(), consumer.into_future());
    broker_result?;
    consumer_result?;

    // No request can emit anymore; let the audit writer drain
    if let Some(writer) = audit_writer {
        tracing::info!("Flushing audit events...");
        let _ = audit_shutdown_tx.send(());
        writer.finish().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn wait_for_shutdown(mut shutdown: broadcast::Receiver<()>) {
    let _ = shutdown.recv().await;
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    let _ = shutdown_tx.send(());
}

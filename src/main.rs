//! market-booking server entry point.
//!
//! Starts the Axum HTTP server, the notification delivery log and the
//! expired-hold cleanup task.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use market_booking::api;
use market_booking::app_state::AppState;
use market_booking::blob::{BlobStore, MemoryBlobStore};
use market_booking::clock::{Clock, SystemClock};
use market_booking::config::{LogFormat, ServiceConfig, StoreBackend};
use market_booking::domain::EventBus;
use market_booking::service::{BookingService, spawn_delivery_log};
use market_booking::store::{DocumentStore, MemoryStore, PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServiceConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(
        addr = %config.listen_addr,
        backend = ?config.store_backend,
        "starting market-booking"
    );

    // Build storage
    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Postgres => Arc::new(PostgresStore::connect(&config).await?),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new(config.blob_base_url.clone()));
    let event_bus = EventBus::new(config.event_bus_capacity);

    // Build service layer
    let service = BookingService::new(store, clock, blobs, event_bus);
    let app_state = AppState::new(service);

    let _delivery_log = spawn_delivery_log(&app_state.event_bus);

    if config.lock_cleanup_interval_secs > 0 {
        spawn_lock_cleanup(
            Arc::clone(&app_state.booking_service),
            Duration::from_secs(config.lock_cleanup_interval_secs),
        );
    }

    let app = api::app(app_state, &config);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn spawn_lock_cleanup(service: Arc<BookingService>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(error) = service.purge_expired_locks().await {
                tracing::warn!(%error, "expired hold cleanup failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

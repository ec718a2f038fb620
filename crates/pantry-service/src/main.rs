//! Pantry Service - HTTP API for depletion tracking and restock reminders
//!
//! This is the main entry point for the pantry service.

use std::sync::Arc;

use pantry_engine::{PantryEngine, Scheduler, SystemClock};
use pantry_store::Store;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pantry_service::{create_router, AppState, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pantry=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pantry Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        daily_tick_time = %config.engine.daily_tick_time,
        reminder_time = %config.engine.reminder_time,
        reestimation_interval_days = config.engine.reestimation_interval_days,
        scheduler_enabled = config.scheduler_enabled,
        "Service configuration loaded"
    );

    let store = open_store(&config)?;
    let engine = Arc::new(PantryEngine::new(
        store,
        Arc::new(SystemClock),
        config.engine.clone(),
    )?);

    // Start the scheduler; startup reconciliation runs before the first daily tick
    let scheduler = config
        .scheduler_enabled
        .then(|| Scheduler::new(Arc::clone(&engine)).start());

    let mut state = AppState::new(engine, config.clone());
    if let Some(handle) = &scheduler {
        state = state.with_scheduler(handle.status());
    }

    let app = create_router(state);

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = scheduler {
        tracing::info!("Waiting for scheduler to finish in-flight items");
        handle.shutdown().await;
    }

    tracing::info!("Pantry Service stopped");
    Ok(())
}

#[cfg(feature = "rocksdb-backend")]
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    Ok(Arc::new(pantry_store::RocksStore::open(&config.data_dir)?))
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::warn!(
        data_dir = %config.data_dir,
        "Built without rocksdb-backend; using in-memory store, state is lost on restart"
    );
    Ok(Arc::new(pantry_store::MemoryStore::new()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

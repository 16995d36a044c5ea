use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use meeting_scheduler_api::app::{create_app, AppState};
use meeting_scheduler_api::config::{Config, StorageBackend};
use meeting_scheduler_api::jobs::{CacheSweepJob, JobScheduler, PoolMetricsJob};
use meeting_scheduler_api::middleware::{init_metrics, logging::init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging)?;
    init_metrics()?;

    info!(
        storage = ?config.storage.backend,
        "Starting meeting scheduler v{}",
        env!("CARGO_PKG_VERSION")
    );

    let pool = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = persistence::db::create_pool(&config.database.pool_config()).await?;
            info!("Running database migrations...");
            persistence::db::run_migrations(&pool).await?;
            info!("Migrations completed");
            Some(pool)
        }
        StorageBackend::Memory => None,
    };

    let addr = config.socket_addr()?;
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let sweep_interval = config.cache.sweep_interval_secs;

    let state = AppState::new(config, pool.clone());

    let mut scheduler = JobScheduler::new();
    scheduler.register(CacheSweepJob::new(Arc::clone(&state.cache), sweep_interval));
    if let Some(pool) = &pool {
        scheduler.register(PoolMetricsJob::new(pool.clone()));
    }
    scheduler.start();

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(shutdown_timeout).await;

    if let Some(pool) = pool {
        pool.close().await;
        info!("Database pool closed");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

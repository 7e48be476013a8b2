//! Radiant kernel runner.

use std::sync::Arc;

use radiant_app::{AppError, Kernel, KernelConfig};
use radiant_core::clock::SystemClock;
use radiant_core::store::EventStore;
use radiant_event_store::{InMemoryEventStore, PgEventStore};
use radiant_translation::provider::OfflineTranslationProvider;
use tracing_subscriber::EnvFilter;

async fn open_store(config: &KernelConfig) -> Result<Arc<dyn EventStore>, AppError> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, events are kept in memory only");
        return Ok(Arc::new(InMemoryEventStore::new()));
    };
    let store = PgEventStore::connect(url, config.database_max_connections).await?;
    store.ensure_schema().await?;
    tracing::info!("connected to PostgreSQL event store");
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Radiant kernel");

    let config = KernelConfig::from_env()?;
    let store = open_store(&config).await?;
    let kernel = Kernel::start(
        &config,
        store,
        Arc::new(OfflineTranslationProvider),
        Arc::new(SystemClock),
    );

    let report = kernel.rebuild_projections().await?;
    tracing::info!(
        processed = report.processed,
        watermark = report.watermark,
        "read models loaded"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    let report = kernel.shutdown().await;
    if !report.drained {
        tracing::warn!(aborted = report.aborted, "translation jobs were aborted");
    }
    Ok(())
}

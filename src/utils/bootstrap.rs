//! Bootstrap utilities for the cinema-etl binaries.
//!
//! Shared initialization code: tracing, database connections and the
//! orchestrator wiring both binaries use.

use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, DatabaseConfig, LOG_ENV_VAR};
use crate::error::{EtlError, Result};
use crate::etl::{EtlOrchestrator, EtlSettings};
use crate::storage::{backend_name, connect_pool, init_warehouse, Pool, SqlWatermarkStore};
use crate::utils::retry::{connection_backoff, is_retryable_connect_error};

/// Initialize tracing with the CINEMA_ETL_LOG environment variable.
///
/// Defaults to "info" level if CINEMA_ETL_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Open a pool with exponential backoff retry.
///
/// # Arguments
/// * `name` - Human-readable name for logging ("source", "warehouse")
/// * `db` - Connection settings
pub async fn connect_with_retry(name: &str, db: &DatabaseConfig) -> Result<Pool> {
    let pool = (|| async { connect_pool(&db.url, db.max_connections).await })
        .retry(connection_backoff())
        .when(|e: &EtlError| matches!(e, EtlError::Database(err) if is_retryable_connect_error(err)))
        .notify(|err: &EtlError, dur: Duration| {
            warn!(database = name, error = %err, delay = ?dur, "Connection failed, retrying");
        })
        .await?;

    info!(database = name, backend = backend_name(), "Connected");
    Ok(pool)
}

/// Connect both databases, create the warehouse schema, and build an
/// orchestrator with the SQL watermark store.
pub async fn build_orchestrator(config: &Config) -> Result<EtlOrchestrator> {
    let source = connect_with_retry("source", &config.source).await?;
    let warehouse = connect_with_retry("warehouse", &config.warehouse).await?;
    init_warehouse(&warehouse).await?;

    let watermarks = Arc::new(SqlWatermarkStore::new(warehouse.clone()).with_epoch(config.etl.epoch));
    Ok(EtlOrchestrator::new(
        source,
        warehouse,
        watermarks,
        EtlSettings::from_config(config),
    ))
}

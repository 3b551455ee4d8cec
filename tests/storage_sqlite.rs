//! SQLite watermark store integration tests.
//!
//! Run with: cargo test --test storage_sqlite --features sqlite
//!
//! Uses in-memory database by default, no external dependencies required.

#![cfg(all(feature = "sqlite", not(feature = "postgres")))]

mod storage;

use chrono::{TimeZone, Utc};

use cinema_etl::storage::mock::MemoryWatermarkStore;
use cinema_etl::storage::{connect_pool, init_warehouse, Pool, SqlWatermarkStore, WatermarkStore};

/// Get SQLite connection string (in-memory for tests)
fn sqlite_uri() -> String {
    std::env::var("SQLITE_URI").unwrap_or_else(|_| "sqlite::memory:".to_string())
}

async fn connect_and_init() -> Pool {
    let pool = connect_pool(&sqlite_uri(), 1)
        .await
        .expect("Failed to connect to SQLite");
    init_warehouse(&pool)
        .await
        .expect("Failed to create warehouse schema");
    pool
}

#[tokio::test]
async fn test_sqlite_watermark_store() {
    println!("=== SQLite WatermarkStore Tests ===");
    println!("Connecting to: {}", sqlite_uri());

    let pool = connect_and_init().await;
    let store = SqlWatermarkStore::new(pool);

    run_watermark_store_tests!(&store);

    println!("=== All SQLite WatermarkStore tests PASSED ===");
}

#[tokio::test]
async fn test_memory_watermark_store() {
    println!("=== Memory WatermarkStore Tests ===");

    let store = MemoryWatermarkStore::new();

    run_watermark_store_tests!(&store);

    println!("=== All Memory WatermarkStore tests PASSED ===");
}

#[tokio::test]
async fn test_sqlite_custom_epoch() {
    let pool = connect_and_init().await;
    let epoch = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
    let store = SqlWatermarkStore::new(pool).with_epoch(epoch);

    assert_eq!(
        store.get_last_loaded_time("fact_revenue").await.unwrap(),
        epoch
    );
}

#[tokio::test]
async fn test_init_warehouse_is_idempotent() {
    let pool = connect_and_init().await;
    init_warehouse(&pool)
        .await
        .expect("second schema init should be a no-op");
}

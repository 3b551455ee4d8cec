use chrono::{Duration, TimeZone, Utc};

use super::*;
use crate::storage::{default_epoch, WatermarkStore};

#[tokio::test]
async fn test_missing_watermark_returns_epoch() {
    let store = MemoryWatermarkStore::new();
    let at = store.get_last_loaded_time("fact_revenue").await.unwrap();
    assert_eq!(at, default_epoch());
}

#[tokio::test]
async fn test_update_then_get() {
    let store = MemoryWatermarkStore::new();
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap();

    store.update_last_loaded_time("fact_revenue", at).await.unwrap();

    assert_eq!(store.get_last_loaded_time("fact_revenue").await.unwrap(), at);
    assert_eq!(store.update_count().await, 1);
}

#[tokio::test]
async fn test_update_never_regresses() {
    let store = MemoryWatermarkStore::new();
    let newer = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

    store.update_last_loaded_time("fact_revenue", newer).await.unwrap();
    store
        .update_last_loaded_time("fact_revenue", newer - Duration::days(30))
        .await
        .unwrap();

    assert_eq!(store.get_stored("fact_revenue").await, Some(newer));
}

#[tokio::test]
async fn test_failed_update_leaves_watermark() {
    let store = MemoryWatermarkStore::new();
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    store.set("fact_ticket_analysis", at).await;
    store.set_fail_on_update(true).await;

    let result = store
        .update_last_loaded_time("fact_ticket_analysis", at + Duration::hours(1))
        .await;

    assert!(result.is_err());
    assert_eq!(store.get_stored("fact_ticket_analysis").await, Some(at));
}

#[tokio::test]
async fn test_tables_are_isolated() {
    let store = MemoryWatermarkStore::new();
    let at = Utc.with_ymd_and_hms(2024, 5, 5, 5, 5, 5).unwrap();

    store.update_last_loaded_time("fact_revenue", at).await.unwrap();

    assert_eq!(
        store.get_last_loaded_time("fact_film_rating").await.unwrap(),
        default_epoch()
    );
}

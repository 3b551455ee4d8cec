//! WatermarkStore interface tests.
//!
//! These tests verify the contract of the WatermarkStore trait.
//! Each storage implementation should run these tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use cinema_etl::storage::{default_epoch, WatermarkStore};

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
}

// =============================================================================
// get_last_loaded_time tests
// =============================================================================

pub async fn test_get_missing_returns_epoch<S: WatermarkStore>(store: &S) {
    let result = store
        .get_last_loaded_time("test_wm_missing")
        .await
        .expect("get should succeed");
    assert_eq!(result, default_epoch(), "missing watermark should be the epoch");
}

// =============================================================================
// update_last_loaded_time tests
// =============================================================================

pub async fn test_update_and_get<S: WatermarkStore>(store: &S) {
    let table = "test_wm_update_get";

    store
        .update_last_loaded_time(table, at(8))
        .await
        .expect("update should succeed");

    let result = store
        .get_last_loaded_time(table)
        .await
        .expect("get should succeed");
    assert_eq!(result, at(8), "should return stored watermark");
}

pub async fn test_update_advances<S: WatermarkStore>(store: &S) {
    let table = "test_wm_advance";

    store.update_last_loaded_time(table, at(1)).await.unwrap();
    store.update_last_loaded_time(table, at(5)).await.unwrap();

    assert_eq!(store.get_last_loaded_time(table).await.unwrap(), at(5));
}

pub async fn test_update_never_regresses<S: WatermarkStore>(store: &S) {
    let table = "test_wm_no_regress";

    store.update_last_loaded_time(table, at(10)).await.unwrap();
    store
        .update_last_loaded_time(table, at(10) - Duration::days(1))
        .await
        .expect("older update is a no-op, not an error");

    assert_eq!(
        store.get_last_loaded_time(table).await.unwrap(),
        at(10),
        "watermark must not move backwards"
    );
}

pub async fn test_update_same_value<S: WatermarkStore>(store: &S) {
    let table = "test_wm_same";

    store.update_last_loaded_time(table, at(3)).await.unwrap();
    store.update_last_loaded_time(table, at(3)).await.unwrap();

    assert_eq!(store.get_last_loaded_time(table).await.unwrap(), at(3));
}

// =============================================================================
// isolation tests
// =============================================================================

pub async fn test_table_isolation<S: WatermarkStore>(store: &S) {
    store
        .update_last_loaded_time("test_wm_iso_a", at(12))
        .await
        .unwrap();

    assert_eq!(
        store.get_last_loaded_time("test_wm_iso_b").await.unwrap(),
        default_epoch(),
        "other tables keep the epoch"
    );
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all WatermarkStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_watermark_store_tests {
    ($store:expr) => {
        use $crate::storage::watermark_store_tests::*;

        // get tests
        test_get_missing_returns_epoch($store).await;
        println!("  test_get_missing_returns_epoch: PASSED");

        // update tests
        test_update_and_get($store).await;
        println!("  test_update_and_get: PASSED");

        test_update_advances($store).await;
        println!("  test_update_advances: PASSED");

        test_update_never_regresses($store).await;
        println!("  test_update_never_regresses: PASSED");

        test_update_same_value($store).await;
        println!("  test_update_same_value: PASSED");

        // isolation tests
        test_table_isolation($store).await;
        println!("  test_table_isolation: PASSED");
    };
}

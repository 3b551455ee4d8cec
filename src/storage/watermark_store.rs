//! WatermarkStore trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// `2000-01-01T00:00:00Z`, the watermark of a table that has never loaded.
pub const DEFAULT_EPOCH_SECS: i64 = 946_684_800;

/// The "beginning of time" watermark used when no row exists yet.
pub fn default_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(DEFAULT_EPOCH_SECS, 0).unwrap_or_default()
}

/// Interface for per-table load watermarks.
///
/// Tracks, per fact table, the timestamp of the newest source row that has
/// been committed to the warehouse. Fact loaders read it before extracting
/// and advance it only after their data has committed.
///
/// # Invariants
///
/// - A missing row is not an error: `get_last_loaded_time` returns the
///   store's epoch.
/// - Watermarks never move backwards. An update older than the stored value
///   is a no-op.
///
/// # Implementations
///
/// - `SqlWatermarkStore`: `etl_metadata` table in the warehouse
/// - `MemoryWatermarkStore`: In-memory store for testing
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Get the watermark for a fact table, or the epoch if none is stored.
    async fn get_last_loaded_time(&self, table_name: &str) -> Result<DateTime<Utc>>;

    /// Upsert the watermark for a fact table and commit immediately.
    ///
    /// Must only be called after the fact rows it describes have committed.
    async fn update_last_loaded_time(&self, table_name: &str, new_time: DateTime<Utc>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_epoch_is_start_of_2000() {
        assert_eq!(default_epoch().to_rfc3339(), "2000-01-01T00:00:00+00:00");
    }
}

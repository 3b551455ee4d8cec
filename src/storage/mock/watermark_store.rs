//! In-memory WatermarkStore implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{EtlError, Result};
use crate::storage::{default_epoch, WatermarkStore};

/// Watermark store that keeps watermarks in memory.
pub struct MemoryWatermarkStore {
    watermarks: RwLock<HashMap<String, DateTime<Utc>>>,
    epoch: DateTime<Utc>,
    fail_on_update: RwLock<bool>,
    updates: RwLock<u32>,
}

impl Default for MemoryWatermarkStore {
    fn default() -> Self {
        Self {
            watermarks: RwLock::default(),
            epoch: default_epoch(),
            fail_on_update: RwLock::new(false),
            updates: RwLock::new(0),
        }
    }
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a watermark without going through the monotonic update path.
    pub async fn set(&self, table_name: &str, at: DateTime<Utc>) {
        self.watermarks
            .write()
            .await
            .insert(table_name.to_string(), at);
    }

    pub async fn get_stored(&self, table_name: &str) -> Option<DateTime<Utc>> {
        self.watermarks.read().await.get(table_name).copied()
    }

    pub async fn set_fail_on_update(&self, fail: bool) {
        *self.fail_on_update.write().await = fail;
    }

    /// Number of successful update calls, including no-op ones.
    pub async fn update_count(&self) -> u32 {
        *self.updates.read().await
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn get_last_loaded_time(&self, table_name: &str) -> Result<DateTime<Utc>> {
        Ok(self
            .watermarks
            .read()
            .await
            .get(table_name)
            .copied()
            .unwrap_or(self.epoch))
    }

    async fn update_last_loaded_time(&self, table_name: &str, new_time: DateTime<Utc>) -> Result<()> {
        if *self.fail_on_update.read().await {
            return Err(EtlError::WatermarkUnavailable(format!(
                "update of {table_name} rejected"
            )));
        }
        let mut watermarks = self.watermarks.write().await;
        let entry = watermarks.entry(table_name.to_string()).or_insert(new_time);
        if new_time > *entry {
            *entry = new_time;
        }
        *self.updates.write().await += 1;
        Ok(())
    }
}

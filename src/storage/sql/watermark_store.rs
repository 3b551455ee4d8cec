//! SQL WatermarkStore implementation backed by `etl_metadata`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Expr, OnConflict, Query};
use sqlx::Row;
use tracing::debug;

use crate::error::Result;
use crate::storage::schema::EtlMetadata;
use crate::storage::{build_query, default_epoch, Pool, WatermarkStore};

/// Watermarks persisted in the warehouse's `etl_metadata` table.
pub struct SqlWatermarkStore {
    pool: Pool,
    epoch: DateTime<Utc>,
}

impl SqlWatermarkStore {
    /// Create a new store over the warehouse pool.
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            epoch: default_epoch(),
        }
    }

    /// Override the watermark returned for tables that have never loaded.
    pub fn with_epoch(mut self, epoch: DateTime<Utc>) -> Self {
        self.epoch = epoch;
        self
    }
}

#[async_trait]
impl WatermarkStore for SqlWatermarkStore {
    async fn get_last_loaded_time(&self, table_name: &str) -> Result<DateTime<Utc>> {
        let stmt = Query::select()
            .column(EtlMetadata::LastLoadedTime)
            .from(EtlMetadata::Table)
            .and_where(Expr::col(EtlMetadata::TableName).eq(table_name))
            .to_owned();

        let (sql, values) = build_query(&stmt);
        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.try_get("last_loaded_time")?),
            None => Ok(self.epoch),
        }
    }

    async fn update_last_loaded_time(&self, table_name: &str, new_time: DateTime<Utc>) -> Result<()> {
        let updated_at = Utc::now();

        // Only a strictly newer value wins the conflict.
        let stmt = Query::insert()
            .into_table(EtlMetadata::Table)
            .columns([
                EtlMetadata::TableName,
                EtlMetadata::LastLoadedTime,
                EtlMetadata::UpdatedAt,
            ])
            .values([table_name.into(), new_time.into(), updated_at.into()])?
            .on_conflict(
                OnConflict::column(EtlMetadata::TableName)
                    .update_columns([EtlMetadata::LastLoadedTime, EtlMetadata::UpdatedAt])
                    .action_and_where(
                        Expr::col((EtlMetadata::Table, EtlMetadata::LastLoadedTime)).lt(new_time),
                    )
                    .to_owned(),
            )
            .to_owned();

        let (sql, values) = build_query(&stmt);
        sqlx::query_with(&sql, values).execute(&self.pool).await?;

        debug!(table = %table_name, watermark = %new_time, "Watermark advanced");
        Ok(())
    }
}

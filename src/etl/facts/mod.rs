//! Incremental fact loaders.
//!
//! Each fact implements [`IncrementalFact`]: how to page its source rows
//! after a cursor and how to turn one record into one warehouse row. The
//! shared driver [`run_incremental`] owns the watermark protocol:
//!
//! 1. Read the stored watermark (or the epoch on a full reload).
//! 2. Page source rows strictly after it and no later than the run's
//!    dimension snapshot, ordered by `(timestamp, id)`.
//! 3. Decode, transform, check dimension keys, upsert; commit once per page.
//! 4. After the last page, advance the watermark to the newest timestamp
//!    that was actually written.
//!
//! Any error before step 4 completes leaves the watermark where it was.

mod film_rating;
mod index;
mod promotion_analysis;
mod revenue;
mod showtime_fillrate;
mod ticket_analysis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage::{build_query, DbRow, Pool, WatermarkStore};

use super::{Cursor, EtlSettings, LoadStats, PageRequest, SkipReason, UpsertRow};

pub use film_rating::{FilmRatingFact, FilmRatingLoader, RateRecord};
pub use index::DimensionIndex;
pub use promotion_analysis::{PromotionAnalysisFact, PromotionAnalysisLoader, PromotionBillRecord};
pub use revenue::{RevenueFact, RevenueLoader, RevenueRecord};
pub use showtime_fillrate::{ShowtimeActivityRecord, ShowtimeFillrateFact, ShowtimeFillrateLoader};
pub use ticket_analysis::{TicketAnalysisFact, TicketAnalysisLoader, TicketRecord};

/// Everything a fact loader needs for one run.
#[derive(Clone, Copy)]
pub struct FactContext<'a> {
    pub source: &'a Pool,
    pub warehouse: &'a Pool,
    pub watermarks: &'a dyn WatermarkStore,
    pub settings: &'a EtlSettings,
    pub dims: &'a DimensionIndex,
    /// Run start, taken before the dimension phase. Fact reads stop here so
    /// every row they see had its dimensions loaded.
    pub loaded_at: DateTime<Utc>,
}

/// Object-safe face of a fact loader, as driven by the orchestrator.
#[async_trait]
pub trait FactLoader: Send + Sync {
    fn table(&self) -> &'static str;

    async fn load(&self, ctx: &FactContext<'_>) -> Result<LoadStats>;
}

/// One incrementally loaded fact table.
#[async_trait]
pub trait IncrementalFact: Send + Sync + 'static {
    /// Warehouse table name, also the watermark key.
    const TABLE: &'static str;
    /// Result columns holding the keyset position. A row whose position
    /// cannot be decoded fails the page.
    const AT_COLUMN: &'static str;
    const ID_COLUMN: &'static str;

    /// One source record as fetched.
    type Record: Send + Sync;
    /// Per-run data fetched once before paging starts.
    type State: Send + Sync;
    /// The warehouse row.
    type Fact: UpsertRow + Send;

    async fn prepare(&self, _ctx: &FactContext<'_>) -> Result<Self::State>;

    /// Source rows inside `page`, in cursor order.
    async fn fetch_page(&self, source: &Pool, page: &PageRequest) -> Result<Vec<DbRow>>;

    /// Decode everything but the position. A bad value skips the row.
    fn decode(row: &DbRow, position: Cursor) -> std::result::Result<Self::Record, SkipReason>;

    fn transform(
        &self,
        record: &Self::Record,
        state: &Self::State,
        dims: &DimensionIndex,
        settings: &EtlSettings,
    ) -> std::result::Result<Self::Fact, SkipReason>;
}

#[async_trait]
impl<F: IncrementalFact> FactLoader for F {
    fn table(&self) -> &'static str {
        F::TABLE
    }

    async fn load(&self, ctx: &FactContext<'_>) -> Result<LoadStats> {
        run_incremental(self, ctx).await
    }
}

/// Drive one incremental load to completion.
pub async fn run_incremental<F: IncrementalFact>(fact: &F, ctx: &FactContext<'_>) -> Result<LoadStats> {
    let table = F::TABLE;
    let stored = ctx.watermarks.get_last_loaded_time(table).await?;
    let from = if ctx.settings.full_reload {
        ctx.settings.epoch
    } else {
        stored
    };
    let batch_size = ctx.settings.batch_size;
    info!(table, watermark = %from, full_reload = ctx.settings.full_reload, "Fact load starting");

    let state = fact.prepare(ctx).await?;
    let mut page = PageRequest {
        after: Cursor::start(from),
        until: ctx.loaded_at,
        limit: batch_size,
    };
    let mut stats = LoadStats::default();
    let mut newest_written: Option<DateTime<Utc>> = None;

    loop {
        // The page is fully fetched before the warehouse transaction opens.
        let rows = fact.fetch_page(ctx.source, &page).await?;
        let positions = rows
            .iter()
            .map(position_of::<F>)
            .collect::<Result<Vec<_>>>()?;
        let Some(last) = positions.last() else {
            break;
        };
        page.after = *last;

        let mut tx = ctx.warehouse.begin().await?;
        let mut page_newest = None;
        for (row, &position) in rows.iter().zip(&positions) {
            stats.read += 1;
            let transformed = F::decode(row, position)
                .and_then(|record| fact.transform(&record, &state, ctx.dims, ctx.settings));
            match transformed {
                Ok(fact_row) => {
                    let (sql, values) = build_query(&fact_row.upsert(ctx.loaded_at)?);
                    sqlx::query_with(&sql, values).execute(&mut *tx).await?;
                    stats.written += 1;
                    page_newest = page_newest.max(Some(position.at));
                }
                Err(reason) => {
                    warn!(table, source_id = position.id, %reason, "Skipping source record");
                    stats.record_skip();
                }
            }
        }
        tx.commit().await?;
        stats.batches += 1;
        newest_written = newest_written.max(page_newest);
        debug!(table, rows = rows.len(), cursor = %page.after.at, "Fact page committed");

        if (rows.len() as u64) < batch_size {
            break;
        }
    }

    match newest_written {
        Some(at) if at > stored => {
            ctx.watermarks.update_last_loaded_time(table, at).await?;
            stats.watermark = Some(at);
        }
        _ => debug!(table, "Watermark unchanged"),
    }

    info!(
        table,
        read = stats.read,
        written = stats.written,
        skipped = stats.skipped,
        batches = stats.batches,
        "Fact loaded"
    );
    Ok(stats)
}

fn position_of<F: IncrementalFact>(row: &DbRow) -> Result<Cursor> {
    Ok(Cursor::new(row.try_get(F::AT_COLUMN)?, row.try_get(F::ID_COLUMN)?))
}

/// Fact loaders in the order the orchestrator runs them.
pub fn default_loaders() -> Vec<Box<dyn FactLoader>> {
    vec![
        Box::new(TicketAnalysisLoader),
        Box::new(FilmRatingLoader),
        Box::new(RevenueLoader),
        Box::new(ShowtimeFillrateLoader),
        Box::new(PromotionAnalysisLoader),
    ]
}

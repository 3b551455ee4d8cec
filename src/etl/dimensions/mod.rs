//! Dimension loaders.
//!
//! Every dimension is refreshed in full on each run and merged by natural
//! key. Source-backed dimensions scan their table in id order one page at a
//! time; code and calendar dimensions are generated and go through the same
//! upsert path.

mod generated;
mod source;

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{ColumnRef, Expr, InsertStatement, Order, SelectStatement};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage::{build_query, DbRow};

use super::{LoadContext, LoadStats, SkipReason, UpsertRow};

pub use generated::{DateDimension, PaymentMethodDimension, PurchaseTypeDimension, TimeDimension};
pub use source::{CinemaRow, FilmRow, GenreRow, PromotionRow, ShowtimeRow, TicketRow};

/// A loader that refreshes one dimension table.
#[async_trait]
pub trait DimensionLoader: Send + Sync {
    /// Warehouse table this loader writes.
    fn table(&self) -> &'static str;

    async fn load(&self, ctx: &LoadContext<'_>) -> Result<LoadStats>;
}

/// A dimension read row-for-row from one source table.
pub trait SourceDimension: UpsertRow + Sized + Send + Sync {
    const TABLE: &'static str;

    /// Unpaged select over the source table. Must expose the source id as `id`.
    fn select() -> SelectStatement;

    /// Source id column, used for keyset paging.
    fn id_column() -> ColumnRef;

    fn from_row(row: &DbRow) -> std::result::Result<Self, SkipReason>;
}

/// Full scan of a source table, keyset-paged by id.
pub struct ScanLoader<D> {
    _row: PhantomData<fn() -> D>,
}

impl<D> ScanLoader<D> {
    pub fn new() -> Self {
        Self { _row: PhantomData }
    }
}

impl<D> Default for ScanLoader<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<D: SourceDimension + 'static> DimensionLoader for ScanLoader<D> {
    fn table(&self) -> &'static str {
        D::TABLE
    }

    async fn load(&self, ctx: &LoadContext<'_>) -> Result<LoadStats> {
        let batch_size = ctx.settings.batch_size;
        let mut stats = LoadStats::default();
        let mut last_id: Option<i32> = None;

        loop {
            let mut stmt = D::select();
            if let Some(id) = last_id {
                stmt.and_where(Expr::col(D::id_column()).gt(id));
            }
            stmt.order_by(D::id_column(), Order::Asc).limit(batch_size);

            let (sql, values) = build_query(&stmt);
            let rows = sqlx::query_with(&sql, values).fetch_all(ctx.source).await?;
            if rows.is_empty() {
                break;
            }

            let mut tx = ctx.warehouse.begin().await?;
            for row in &rows {
                let id: i32 = row.try_get("id")?;
                last_id = Some(id);
                stats.read += 1;

                match D::from_row(row) {
                    Ok(dim) => {
                        let (sql, values) = build_query(&dim.upsert(ctx.loaded_at)?);
                        sqlx::query_with(&sql, values).execute(&mut *tx).await?;
                        stats.written += 1;
                    }
                    Err(reason) => {
                        warn!(table = D::TABLE, source_id = id, %reason, "Skipping dimension row");
                        stats.record_skip();
                    }
                }
            }
            tx.commit().await?;
            stats.batches += 1;
            debug!(table = D::TABLE, rows = rows.len(), "Dimension page committed");

            if (rows.len() as u64) < batch_size {
                break;
            }
        }

        info!(
            table = D::TABLE,
            read = stats.read,
            written = stats.written,
            skipped = stats.skipped,
            "Dimension loaded"
        );
        Ok(stats)
    }
}

/// Write pre-built upserts in transactions of `batch_size` statements.
pub(crate) async fn write_generated(
    ctx: &LoadContext<'_>,
    table: &'static str,
    rows: Vec<InsertStatement>,
) -> Result<LoadStats> {
    let mut stats = LoadStats::default();
    let chunk = usize::try_from(ctx.settings.batch_size).unwrap_or(usize::MAX);

    for page in rows.chunks(chunk.max(1)) {
        let mut tx = ctx.warehouse.begin().await?;
        for stmt in page {
            let (sql, values) = build_query(stmt);
            sqlx::query_with(&sql, values).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        stats.read += page.len() as u64;
        stats.written += page.len() as u64;
        stats.batches += 1;
    }

    info!(table, written = stats.written, "Dimension generated");
    Ok(stats)
}

/// Loaders in the order the orchestrator runs them: code and calendar
/// dimensions first, then the source-backed ones.
pub fn default_loaders() -> Vec<Box<dyn DimensionLoader>> {
    vec![
        Box::new(TimeDimension),
        Box::new(DateDimension),
        Box::new(PaymentMethodDimension),
        Box::new(PurchaseTypeDimension),
        Box::new(ScanLoader::<FilmRow>::new()),
        Box::new(ScanLoader::<GenreRow>::new()),
        Box::new(ScanLoader::<CinemaRow>::new()),
        Box::new(ScanLoader::<ShowtimeRow>::new()),
        Box::new(ScanLoader::<TicketRow>::new()),
        Box::new(ScanLoader::<PromotionRow>::new()),
    ]
}

/// Helper for generated rows stamped with the run's load time.
pub(crate) fn upserts<R: UpsertRow>(
    rows: impl IntoIterator<Item = R>,
    loaded_at: DateTime<Utc>,
) -> std::result::Result<Vec<InsertStatement>, sea_query::error::Error> {
    rows.into_iter().map(|row| row.upsert(loaded_at)).collect()
}

//! Keyset paging and per-loader counters.

use chrono::{DateTime, Utc};
use sea_query::{Cond, Condition, Expr, SimpleExpr};
use serde::Serialize;

/// Position of the last row seen by an incremental loader.
///
/// Rows are ordered by `(timestamp, id)`; the next page starts strictly after
/// the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    pub at: DateTime<Utc>,
    pub id: i32,
}

impl Cursor {
    pub fn new(at: DateTime<Utc>, id: i32) -> Self {
        Self { at, id }
    }

    /// Cursor positioned after every row stamped at or before `watermark`.
    pub fn start(watermark: DateTime<Utc>) -> Self {
        Self {
            at: watermark,
            id: i32::MAX,
        }
    }
}

/// `ts > c.at OR (ts = c.at AND id > c.id)`
pub fn keyset_after(ts: SimpleExpr, id: SimpleExpr, cursor: &Cursor) -> Condition {
    Cond::any()
        .add(Expr::expr(ts.clone()).gt(cursor.at))
        .add(
            Cond::all()
                .add(Expr::expr(ts).eq(cursor.at))
                .add(Expr::expr(id).gt(cursor.id)),
        )
}

/// One page of an incremental read: up to `limit` rows strictly after
/// `after` and stamped no later than `until`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    pub after: Cursor,
    pub until: DateTime<Utc>,
    pub limit: u64,
}

impl PageRequest {
    /// Keyset condition bounded above by `until`.
    pub fn window(&self, ts: SimpleExpr, id: SimpleExpr) -> Condition {
        Cond::all()
            .add(keyset_after(ts.clone(), id, &self.after))
            .add(Expr::expr(ts).lte(self.until))
    }
}

/// Volumes for one loader invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadStats {
    /// Source records examined.
    pub read: u64,
    /// Rows upserted into the warehouse.
    pub written: u64,
    /// Records rejected with a [`SkipReason`](super::SkipReason).
    pub skipped: u64,
    /// Committed pages.
    pub batches: u64,
    /// Watermark the loader advanced to, if it advanced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<DateTime<Utc>>,
}

impl LoadStats {
    pub(crate) fn record_skip(&mut self) {
        self.skipped += 1;
    }
}

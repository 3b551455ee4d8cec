//! `fact_promotion_analysis`: whether each bill used a promotion.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_query::{Expr, InsertStatement, OnConflict, Order, Query};
use sqlx::Row;
use tracing::debug;

use crate::error::Result;
use crate::etl::derive::date_id;
use crate::etl::{Cursor, EtlSettings, PageRequest, SkipReason, UpsertRow};
use crate::storage::schema::FactPromotionAnalysis;
use crate::storage::source::{BillProms, Bills};
use crate::storage::{build_query, DbRow, Pool};

use super::{DimensionIndex, FactContext, IncrementalFact};

#[derive(Debug, Clone, PartialEq)]
pub struct PromotionBillRecord {
    pub bill_id: i32,
    pub payment_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromotionAnalysisFact {
    pub bill_id: i32,
    pub date_id: NaiveDate,
    pub promotion_used: bool,
}

impl UpsertRow for PromotionAnalysisFact {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> std::result::Result<InsertStatement, sea_query::error::Error> {
        Ok(Query::insert()
            .into_table(FactPromotionAnalysis::Table)
            .columns([
                FactPromotionAnalysis::BillId,
                FactPromotionAnalysis::DateId,
                FactPromotionAnalysis::PromotionUsed,
                FactPromotionAnalysis::EtlLoadedAt,
            ])
            .values([
                self.bill_id.into(),
                self.date_id.into(),
                self.promotion_used.into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(FactPromotionAnalysis::BillId)
                    .update_columns([
                        FactPromotionAnalysis::DateId,
                        FactPromotionAnalysis::PromotionUsed,
                        FactPromotionAnalysis::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

pub struct PromotionAnalysisLoader;

#[async_trait]
impl IncrementalFact for PromotionAnalysisLoader {
    const TABLE: &'static str = "fact_promotion_analysis";
    const AT_COLUMN: &'static str = "payment_time";
    const ID_COLUMN: &'static str = "id";

    type Record = PromotionBillRecord;
    /// Bills with at least one promotion attached.
    type State = HashSet<i32>;
    type Fact = PromotionAnalysisFact;

    async fn prepare(&self, ctx: &FactContext<'_>) -> Result<HashSet<i32>> {
        let stmt = Query::select()
            .distinct()
            .column(BillProms::BillId)
            .from(BillProms::Table)
            .and_where(Expr::col(BillProms::BillId).is_not_null())
            .to_owned();

        let (sql, values) = build_query(&stmt);
        let rows = sqlx::query_with(&sql, values).fetch_all(ctx.source).await?;
        let promoted = rows
            .iter()
            .map(|row| row.try_get::<i32, _>(0))
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        debug!(bills = promoted.len(), "Promoted bills fetched");
        Ok(promoted)
    }

    async fn fetch_page(&self, source: &Pool, page: &PageRequest) -> Result<Vec<DbRow>> {
        let stmt = Query::select()
            .columns([Bills::Id, Bills::PaymentTime])
            .from(Bills::Table)
            .cond_where(page.window(
                Expr::col(Bills::PaymentTime).into(),
                Expr::col(Bills::Id).into(),
            ))
            .order_by(Bills::PaymentTime, Order::Asc)
            .order_by(Bills::Id, Order::Asc)
            .limit(page.limit)
            .to_owned();

        let (sql, values) = build_query(&stmt);
        Ok(sqlx::query_with(&sql, values).fetch_all(source).await?)
    }

    fn decode(_row: &DbRow, position: Cursor) -> std::result::Result<PromotionBillRecord, SkipReason> {
        Ok(PromotionBillRecord {
            bill_id: position.id,
            payment_time: position.at,
        })
    }

    fn transform(
        &self,
        record: &PromotionBillRecord,
        promoted: &HashSet<i32>,
        dims: &DimensionIndex,
        _settings: &EtlSettings,
    ) -> std::result::Result<PromotionAnalysisFact, SkipReason> {
        Ok(PromotionAnalysisFact {
            bill_id: record.bill_id,
            date_id: dims.date(date_id(record.payment_time))?,
            promotion_used: promoted.contains(&record.bill_id),
        })
    }
}

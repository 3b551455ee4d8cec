//! `fact_ticket_analysis`: one row per ticket, dated by ticket creation and
//! classified by the bill that paid for it.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_query::{Alias, Expr, InsertStatement, OnConflict, Order, Query};

use crate::error::Result;
use crate::etl::derive::{date_id, time_id, PurchaseType};
use crate::etl::{optional_column, Cursor, EtlSettings, PageRequest, SkipReason, UpsertRow};
use crate::storage::schema::FactTicketAnalysis;
use crate::storage::source::{Bills, Tickets};
use crate::storage::{build_query, DbRow, Pool};

use super::{DimensionIndex, FactContext, IncrementalFact};

/// A ticket with its (optional) bill.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRecord {
    pub ticket_id: i32,
    pub created_at: DateTime<Utc>,
    pub price: Option<i32>,
    pub bill_id: Option<i32>,
    /// False when `bill_id` points at no bill.
    pub bill_found: bool,
    pub payment_method: Option<String>,
    pub staff_id: Option<i32>,
}

impl TicketRecord {
    fn from_row(row: &DbRow, position: Cursor) -> std::result::Result<Self, SkipReason> {
        Ok(Self {
            ticket_id: position.id,
            created_at: position.at,
            price: optional_column(row, "price")?,
            bill_id: optional_column(row, "bill_id")?,
            bill_found: optional_column::<i32>(row, "bill_ref")?.is_some(),
            payment_method: optional_column(row, "payment_method")?,
            staff_id: optional_column(row, "staff_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketAnalysisFact {
    pub ticket_id: i32,
    pub bill_id: i32,
    pub date_id: NaiveDate,
    pub time_id: i32,
    pub price: i32,
    pub payment_method_id: i32,
    pub purchase_type_id: i32,
}

impl UpsertRow for TicketAnalysisFact {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> std::result::Result<InsertStatement, sea_query::error::Error> {
        Ok(Query::insert()
            .into_table(FactTicketAnalysis::Table)
            .columns([
                FactTicketAnalysis::TicketId,
                FactTicketAnalysis::BillId,
                FactTicketAnalysis::DateId,
                FactTicketAnalysis::TimeId,
                FactTicketAnalysis::Price,
                FactTicketAnalysis::PaymentMethodId,
                FactTicketAnalysis::PurchaseTypeId,
                FactTicketAnalysis::EtlLoadedAt,
            ])
            .values([
                self.ticket_id.into(),
                self.bill_id.into(),
                self.date_id.into(),
                self.time_id.into(),
                self.price.into(),
                self.payment_method_id.into(),
                self.purchase_type_id.into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(FactTicketAnalysis::TicketId)
                    .update_columns([
                        FactTicketAnalysis::BillId,
                        FactTicketAnalysis::DateId,
                        FactTicketAnalysis::TimeId,
                        FactTicketAnalysis::Price,
                        FactTicketAnalysis::PaymentMethodId,
                        FactTicketAnalysis::PurchaseTypeId,
                        FactTicketAnalysis::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

pub struct TicketAnalysisLoader;

#[async_trait]
impl IncrementalFact for TicketAnalysisLoader {
    const TABLE: &'static str = "fact_ticket_analysis";
    const AT_COLUMN: &'static str = "created_at";
    const ID_COLUMN: &'static str = "ticket_id";

    type Record = TicketRecord;
    type State = ();
    type Fact = TicketAnalysisFact;

    async fn prepare(&self, _ctx: &FactContext<'_>) -> Result<()> {
        Ok(())
    }

    async fn fetch_page(&self, source: &Pool, page: &PageRequest) -> Result<Vec<DbRow>> {
        let stmt = Query::select()
            .expr_as(Expr::col((Tickets::Table, Tickets::Id)), Alias::new("ticket_id"))
            .expr_as(Expr::col((Tickets::Table, Tickets::CreatedAt)), Alias::new("created_at"))
            .expr_as(Expr::col((Tickets::Table, Tickets::Price)), Alias::new("price"))
            .expr_as(Expr::col((Tickets::Table, Tickets::BillId)), Alias::new("bill_id"))
            .expr_as(Expr::col((Bills::Table, Bills::Id)), Alias::new("bill_ref"))
            .expr_as(Expr::col((Bills::Table, Bills::PaymentMethod)), Alias::new("payment_method"))
            .expr_as(Expr::col((Bills::Table, Bills::StaffId)), Alias::new("staff_id"))
            .from(Tickets::Table)
            .left_join(
                Bills::Table,
                Expr::col((Bills::Table, Bills::Id)).equals((Tickets::Table, Tickets::BillId)),
            )
            .cond_where(page.window(
                Expr::col((Tickets::Table, Tickets::CreatedAt)).into(),
                Expr::col((Tickets::Table, Tickets::Id)).into(),
            ))
            .order_by((Tickets::Table, Tickets::CreatedAt), Order::Asc)
            .order_by((Tickets::Table, Tickets::Id), Order::Asc)
            .limit(page.limit)
            .to_owned();

        let (sql, values) = build_query(&stmt);
        Ok(sqlx::query_with(&sql, values).fetch_all(source).await?)
    }

    fn decode(row: &DbRow, position: Cursor) -> std::result::Result<TicketRecord, SkipReason> {
        TicketRecord::from_row(row, position)
    }

    fn transform(
        &self,
        record: &TicketRecord,
        _state: &(),
        dims: &DimensionIndex,
        settings: &EtlSettings,
    ) -> std::result::Result<TicketAnalysisFact, SkipReason> {
        let bill_id = record
            .bill_id
            .ok_or(SkipReason::MissingLink("ticket.bill_id"))?;
        if !record.bill_found {
            return Err(SkipReason::MissingLink("bill"));
        }
        let price = record.price.ok_or(SkipReason::MissingField("price"))?;
        let payment_method_id = settings
            .payment_methods
            .resolve(record.payment_method.as_deref())?;
        let purchase_type_id = PurchaseType::from_staff(record.staff_id).id();

        Ok(TicketAnalysisFact {
            ticket_id: record.ticket_id,
            bill_id,
            date_id: dims.date(date_id(record.created_at))?,
            time_id: dims.time(time_id(record.created_at))?,
            price,
            payment_method_id: dims.payment_method(payment_method_id)?,
            purchase_type_id: dims.purchase_type(purchase_type_id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn dims() -> DimensionIndex {
        DimensionIndex::default()
            .with_codes([1, 2, 3], [1, 2])
            .with_dates([NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()])
            .with_all_times()
    }

    fn record() -> TicketRecord {
        TicketRecord {
            ticket_id: 10,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 19, 30, 0).unwrap(),
            price: Some(90_000),
            bill_id: Some(5),
            bill_found: true,
            payment_method: Some("Thanh toán bằng thẻ tín dụng".to_string()),
            staff_id: None,
        }
    }

    #[test]
    fn test_transform_derives_keys() {
        let fact = TicketAnalysisLoader
            .transform(&record(), &(), &dims(), &EtlSettings::default())
            .unwrap();
        assert_eq!(fact.bill_id, 5);
        assert_eq!(fact.time_id, 19 * 60 + 30);
        assert_eq!(fact.payment_method_id, 2);
        assert_eq!(fact.purchase_type_id, 2);
    }

    #[test]
    fn test_ticket_without_bill_is_skipped() {
        let mut orphan = record();
        orphan.bill_id = None;
        assert_eq!(
            TicketAnalysisLoader.transform(&orphan, &(), &dims(), &EtlSettings::default()),
            Err(SkipReason::MissingLink("ticket.bill_id"))
        );

        let mut dangling = record();
        dangling.bill_found = false;
        assert_eq!(
            TicketAnalysisLoader.transform(&dangling, &(), &dims(), &EtlSettings::default()),
            Err(SkipReason::MissingLink("bill"))
        );
    }

    #[test]
    fn test_ticket_outside_calendar_is_skipped() {
        let mut late = record();
        late.created_at = Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            TicketAnalysisLoader.transform(&late, &(), &dims(), &EtlSettings::default()),
            Err(SkipReason::MissingDimension {
                dimension: "dim_date",
                ..
            })
        ));
    }
}

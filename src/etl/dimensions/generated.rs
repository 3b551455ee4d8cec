//! Code and calendar dimensions, generated from configuration rather than
//! read from the source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{InsertStatement, OnConflict, Query};

use crate::config::PaymentMethodConfig;
use crate::error::Result;
use crate::etl::derive::{day_period, CalendarDay, PurchaseType};
use crate::etl::{LoadContext, LoadStats, UpsertRow};
use crate::storage::schema::{DimDate, DimPaymentMethod, DimPurchaseType, DimTime};

use super::{upserts, write_generated, DimensionLoader};

impl UpsertRow for PaymentMethodConfig {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> std::result::Result<InsertStatement, sea_query::error::Error> {
        Ok(Query::insert()
            .into_table(DimPaymentMethod::Table)
            .columns([
                DimPaymentMethod::PaymentMethodId,
                DimPaymentMethod::MethodName,
                DimPaymentMethod::EtlLoadedAt,
            ])
            .values([self.id.into(), self.label.clone().into(), loaded_at.into()])?
            .on_conflict(
                OnConflict::column(DimPaymentMethod::PaymentMethodId)
                    .update_columns([DimPaymentMethod::MethodName, DimPaymentMethod::EtlLoadedAt])
                    .to_owned(),
            )
            .to_owned())
    }
}

impl UpsertRow for PurchaseType {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> std::result::Result<InsertStatement, sea_query::error::Error> {
        Ok(Query::insert()
            .into_table(DimPurchaseType::Table)
            .columns([
                DimPurchaseType::PurchaseTypeId,
                DimPurchaseType::TypeName,
                DimPurchaseType::Description,
                DimPurchaseType::EtlLoadedAt,
            ])
            .values([
                self.id().into(),
                self.name().into(),
                self.description().into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(DimPurchaseType::PurchaseTypeId)
                    .update_columns([
                        DimPurchaseType::TypeName,
                        DimPurchaseType::Description,
                        DimPurchaseType::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

impl UpsertRow for CalendarDay {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> std::result::Result<InsertStatement, sea_query::error::Error> {
        Ok(Query::insert()
            .into_table(DimDate::Table)
            .columns([
                DimDate::DateId,
                DimDate::Day,
                DimDate::Month,
                DimDate::Year,
                DimDate::Quarter,
                DimDate::Week,
                DimDate::Weekday,
                DimDate::IsWeekend,
                DimDate::EtlLoadedAt,
            ])
            .values([
                self.date.into(),
                self.day.into(),
                self.month.into(),
                self.year.into(),
                self.quarter.into(),
                self.week.into(),
                self.weekday.clone().into(),
                self.is_weekend.into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(DimDate::DateId)
                    .update_columns([
                        DimDate::Day,
                        DimDate::Month,
                        DimDate::Year,
                        DimDate::Quarter,
                        DimDate::Week,
                        DimDate::Weekday,
                        DimDate::IsWeekend,
                        DimDate::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

/// One minute of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl MinuteOfDay {
    pub fn time_id(&self) -> i32 {
        (self.hour * 60 + self.minute) as i32
    }

    /// All 1440 minutes in `time_id` order.
    pub fn all() -> impl Iterator<Item = MinuteOfDay> {
        (0..24u32).flat_map(|hour| (0..60u32).map(move |minute| MinuteOfDay { hour, minute }))
    }
}

impl UpsertRow for MinuteOfDay {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> std::result::Result<InsertStatement, sea_query::error::Error> {
        Ok(Query::insert()
            .into_table(DimTime::Table)
            .columns([
                DimTime::TimeId,
                DimTime::Hour,
                DimTime::Minute,
                DimTime::Period,
                DimTime::EtlLoadedAt,
            ])
            .values([
                self.time_id().into(),
                (self.hour as i32).into(),
                (self.minute as i32).into(),
                day_period(self.hour).into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(DimTime::TimeId)
                    .update_columns([
                        DimTime::Hour,
                        DimTime::Minute,
                        DimTime::Period,
                        DimTime::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

/// `dim_payment_method` from the configured label mapping.
pub struct PaymentMethodDimension;

#[async_trait]
impl DimensionLoader for PaymentMethodDimension {
    fn table(&self) -> &'static str {
        "dim_payment_method"
    }

    async fn load(&self, ctx: &LoadContext<'_>) -> Result<LoadStats> {
        let rows = upserts(
            ctx.settings.payment_methods.entries().iter().cloned(),
            ctx.loaded_at,
        )?;
        write_generated(ctx, self.table(), rows).await
    }
}

/// `dim_purchase_type`: in-person and online.
pub struct PurchaseTypeDimension;

#[async_trait]
impl DimensionLoader for PurchaseTypeDimension {
    fn table(&self) -> &'static str {
        "dim_purchase_type"
    }

    async fn load(&self, ctx: &LoadContext<'_>) -> Result<LoadStats> {
        let rows = upserts(PurchaseType::ALL, ctx.loaded_at)?;
        write_generated(ctx, self.table(), rows).await
    }
}

/// `dim_date` over the configured calendar range, inclusive.
pub struct DateDimension;

#[async_trait]
impl DimensionLoader for DateDimension {
    fn table(&self) -> &'static str {
        "dim_date"
    }

    async fn load(&self, ctx: &LoadContext<'_>) -> Result<LoadStats> {
        let end = ctx.settings.calendar_end;
        let days = ctx
            .settings
            .calendar_start
            .iter_days()
            .take_while(|day| *day <= end)
            .map(CalendarDay::new);
        let rows = upserts(days, ctx.loaded_at)?;
        write_generated(ctx, self.table(), rows).await
    }
}

/// `dim_time`: every minute of the day.
pub struct TimeDimension;

#[async_trait]
impl DimensionLoader for TimeDimension {
    fn table(&self) -> &'static str {
        "dim_time"
    }

    async fn load(&self, ctx: &LoadContext<'_>) -> Result<LoadStats> {
        let rows = upserts(MinuteOfDay::all(), ctx.loaded_at)?;
        write_generated(ctx, self.table(), rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_cover_the_day_in_order() {
        let minutes: Vec<i32> = MinuteOfDay::all().map(|m| m.time_id()).collect();
        assert_eq!(minutes.len(), 1440);
        assert_eq!(minutes.first(), Some(&0));
        assert_eq!(minutes.last(), Some(&1439));
        assert!(minutes.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn test_minute_time_id_matches_derivation() {
        use chrono::TimeZone;
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 18, 5, 0).unwrap();
        let minute = MinuteOfDay { hour: 18, minute: 5 };
        assert_eq!(minute.time_id(), crate::etl::derive::time_id(at));
    }

    #[test]
    fn test_upsert_merges_on_natural_key() {
        let stmt = PurchaseType::Online.upsert(Utc::now()).unwrap();
        let (sql, _) = crate::storage::build_query(&stmt);
        assert!(sql.contains("ON CONFLICT"));
        assert!(sql.contains("\"purchase_type_id\""));
    }
}

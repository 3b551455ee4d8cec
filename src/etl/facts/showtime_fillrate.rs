//! `fact_showtime_fillrate`: seat occupancy snapshot per showtime.
//!
//! A showtime's activity time is the later of its own creation and its
//! newest ticket. Paging by activity picks up both new showtimes and old
//! showtimes that just sold a seat; the fact row is overwritten each time.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_query::{Alias, Cond, Condition, Expr, InsertStatement, OnConflict, Order, Query, SimpleExpr};

use crate::error::Result;
use crate::etl::derive::{date_id, FillRate};
use crate::etl::{optional_column, required_column, Cursor, EtlSettings, PageRequest, SkipReason, UpsertRow};
use crate::storage::schema::FactShowtimeFillrate;
use crate::storage::source::{ShowtimeSeats, Showtimes, Tickets};
use crate::storage::{build_query, DbRow, Pool};

use super::{DimensionIndex, FactContext, IncrementalFact};

/// One showtime with its aggregated seat counts.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowtimeActivityRecord {
    pub showtime_id: i32,
    pub film_id: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub total_seats: i64,
    pub booked_seats: i64,
    pub activity_at: DateTime<Utc>,
}

impl ShowtimeActivityRecord {
    fn from_row(row: &DbRow, position: Cursor) -> std::result::Result<Self, SkipReason> {
        Ok(Self {
            showtime_id: position.id,
            film_id: optional_column(row, "film_id")?,
            start_time: optional_column(row, "start_time")?,
            total_seats: required_column(row, "total_seats")?,
            booked_seats: required_column(row, "booked_seats")?,
            activity_at: position.at,
        })
    }
}

/// Showtimes whose activity can fall at or after `since`: created then, or
/// holding a ticket created then. Applied before grouping.
fn touched_since(since: DateTime<Utc>) -> Condition {
    let ticketed = Query::select()
        .column((ShowtimeSeats::Table, ShowtimeSeats::ShowtimeId))
        .from(ShowtimeSeats::Table)
        .inner_join(
            Tickets::Table,
            Expr::col((Tickets::Table, Tickets::ShowtimeSeatId))
                .equals((ShowtimeSeats::Table, ShowtimeSeats::Id)),
        )
        .and_where(Expr::col((Tickets::Table, Tickets::CreatedAt)).gte(since))
        .to_owned();

    Cond::any()
        .add(Expr::col((Showtimes::Table, Showtimes::CreatedAt)).gte(since))
        .add(Expr::col((Showtimes::Table, Showtimes::Id)).in_subquery(ticketed))
}

fn activity_expr() -> SimpleExpr {
    Expr::cust(
        r#"CASE WHEN MAX("tickets"."created_at") IS NULL OR "showtimes"."created_at" >= MAX("tickets"."created_at") THEN "showtimes"."created_at" ELSE MAX("tickets"."created_at") END"#,
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowtimeFillrateFact {
    pub showtime_id: i32,
    pub date_id: NaiveDate,
    pub film_id: i32,
    pub total_seats: i32,
    pub booked_seats: i32,
    pub fill_rate: f64,
}

impl UpsertRow for ShowtimeFillrateFact {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> std::result::Result<InsertStatement, sea_query::error::Error> {
        Ok(Query::insert()
            .into_table(FactShowtimeFillrate::Table)
            .columns([
                FactShowtimeFillrate::ShowtimeId,
                FactShowtimeFillrate::DateId,
                FactShowtimeFillrate::FilmId,
                FactShowtimeFillrate::TotalSeats,
                FactShowtimeFillrate::BookedSeats,
                FactShowtimeFillrate::FillRate,
                FactShowtimeFillrate::EtlLoadedAt,
            ])
            .values([
                self.showtime_id.into(),
                self.date_id.into(),
                self.film_id.into(),
                self.total_seats.into(),
                self.booked_seats.into(),
                self.fill_rate.into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(FactShowtimeFillrate::ShowtimeId)
                    .update_columns([
                        FactShowtimeFillrate::DateId,
                        FactShowtimeFillrate::FilmId,
                        FactShowtimeFillrate::TotalSeats,
                        FactShowtimeFillrate::BookedSeats,
                        FactShowtimeFillrate::FillRate,
                        FactShowtimeFillrate::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

pub struct ShowtimeFillrateLoader;

#[async_trait]
impl IncrementalFact for ShowtimeFillrateLoader {
    const TABLE: &'static str = "fact_showtime_fillrate";
    const AT_COLUMN: &'static str = "activity_at";
    const ID_COLUMN: &'static str = "showtime_id";

    type Record = ShowtimeActivityRecord;
    type State = ();
    type Fact = ShowtimeFillrateFact;

    async fn prepare(&self, _ctx: &FactContext<'_>) -> Result<()> {
        Ok(())
    }

    async fn fetch_page(&self, source: &Pool, page: &PageRequest) -> Result<Vec<DbRow>> {
        let stmt = Query::select()
            .expr_as(Expr::col((Showtimes::Table, Showtimes::Id)), Alias::new("showtime_id"))
            .expr_as(Expr::col((Showtimes::Table, Showtimes::FilmId)), Alias::new("film_id"))
            .expr_as(Expr::col((Showtimes::Table, Showtimes::StartTime)), Alias::new("start_time"))
            .expr_as(
                Expr::cust(r#"COUNT(DISTINCT "showtime_seats"."id")"#),
                Alias::new("total_seats"),
            )
            .expr_as(
                Expr::cust(r#"COUNT(DISTINCT "tickets"."showtime_seat_id")"#),
                Alias::new("booked_seats"),
            )
            .expr_as(activity_expr(), Alias::new("activity_at"))
            .from(Showtimes::Table)
            .left_join(
                ShowtimeSeats::Table,
                Expr::col((ShowtimeSeats::Table, ShowtimeSeats::ShowtimeId))
                    .equals((Showtimes::Table, Showtimes::Id)),
            )
            .left_join(
                Tickets::Table,
                Expr::col((Tickets::Table, Tickets::ShowtimeSeatId))
                    .equals((ShowtimeSeats::Table, ShowtimeSeats::Id)),
            )
            .cond_where(touched_since(page.after.at))
            .group_by_columns([
                (Showtimes::Table, Showtimes::Id),
                (Showtimes::Table, Showtimes::FilmId),
                (Showtimes::Table, Showtimes::StartTime),
                (Showtimes::Table, Showtimes::CreatedAt),
            ])
            .cond_having(page.window(
                activity_expr(),
                Expr::col((Showtimes::Table, Showtimes::Id)).into(),
            ))
            .order_by_expr(activity_expr(), Order::Asc)
            .order_by((Showtimes::Table, Showtimes::Id), Order::Asc)
            .limit(page.limit)
            .to_owned();

        let (sql, values) = build_query(&stmt);
        Ok(sqlx::query_with(&sql, values).fetch_all(source).await?)
    }

    fn decode(row: &DbRow, position: Cursor) -> std::result::Result<ShowtimeActivityRecord, SkipReason> {
        ShowtimeActivityRecord::from_row(row, position)
    }

    fn transform(
        &self,
        record: &ShowtimeActivityRecord,
        _state: &(),
        dims: &DimensionIndex,
        _settings: &EtlSettings,
    ) -> std::result::Result<ShowtimeFillrateFact, SkipReason> {
        let rate = FillRate::compute(record.total_seats, record.booked_seats)?;
        let film_id = record.film_id.ok_or(SkipReason::MissingField("film_id"))?;
        let start_time = record
            .start_time
            .ok_or(SkipReason::MissingField("start_time"))?;

        Ok(ShowtimeFillrateFact {
            showtime_id: dims.showtime(record.showtime_id)?,
            date_id: dims.date(date_id(start_time))?,
            film_id: dims.film(film_id)?,
            total_seats: rate.total_seats,
            booked_seats: rate.booked_seats,
            fill_rate: rate.fill_rate,
        })
    }
}

//! `fact_revenue`: one row per bill, attributed to a film and a cinema
//! through the chain bill -> ticket -> showtime seat -> showtime -> room.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_query::{Alias, Expr, InsertStatement, OnConflict, Order, Query, SelectStatement};

use crate::error::Result;
use crate::etl::derive::{date_id, time_id, PurchaseType};
use crate::etl::{optional_column, Cursor, EtlSettings, PageRequest, SkipReason, UpsertRow};
use crate::storage::schema::FactRevenue;
use crate::storage::source::{Bills, Rooms, ShowtimeSeats, Showtimes, Tickets};
use crate::storage::{build_query, DbRow, Pool};

use super::{DimensionIndex, FactContext, IncrementalFact};

/// A bill plus every link of its attribution chain. `*_ref` columns are the
/// joined row's own id, null when the referenced row does not exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevenueRecord {
    pub bill_id: i32,
    pub payment_time: DateTime<Utc>,
    pub value: Option<i32>,
    pub payment_method: Option<String>,
    pub staff_id: Option<i32>,
    pub ticket_id: Option<i32>,
    pub ticket_ref: Option<i32>,
    pub showtime_seat_id: Option<i32>,
    pub seat_ref: Option<i32>,
    pub showtime_id: Option<i32>,
    pub showtime_ref: Option<i32>,
    pub film_id: Option<i32>,
    pub room_id: Option<i32>,
    pub room_ref: Option<i32>,
    pub cinema_id: Option<i32>,
}

impl RevenueRecord {
    fn from_row(row: &DbRow, position: Cursor) -> std::result::Result<Self, SkipReason> {
        Ok(Self {
            bill_id: position.id,
            payment_time: position.at,
            value: optional_column(row, "value")?,
            payment_method: optional_column(row, "payment_method")?,
            staff_id: optional_column(row, "staff_id")?,
            ticket_id: optional_column(row, "ticket_id")?,
            ticket_ref: optional_column(row, "ticket_ref")?,
            showtime_seat_id: optional_column(row, "showtime_seat_id")?,
            seat_ref: optional_column(row, "seat_ref")?,
            showtime_id: optional_column(row, "showtime_id")?,
            showtime_ref: optional_column(row, "showtime_ref")?,
            film_id: optional_column(row, "film_id")?,
            room_id: optional_column(row, "room_id")?,
            room_ref: optional_column(row, "room_ref")?,
            cinema_id: optional_column(row, "cinema_id")?,
        })
    }

    /// Walk the attribution chain and return `(film_id, cinema_id)`, or the
    /// first link that is missing.
    pub fn resolve_chain(&self) -> std::result::Result<(i32, i32), SkipReason> {
        let link = |value: Option<i32>, name: &'static str| value.ok_or(SkipReason::MissingLink(name));

        link(self.ticket_id, "bill.ticket_id")?;
        link(self.ticket_ref, "ticket")?;
        link(self.showtime_seat_id, "ticket.showtime_seat_id")?;
        link(self.seat_ref, "showtime_seat")?;
        link(self.showtime_id, "showtime_seat.showtime_id")?;
        link(self.showtime_ref, "showtime")?;
        let film_id = link(self.film_id, "showtime.film_id")?;
        link(self.room_id, "showtime.room_id")?;
        link(self.room_ref, "room")?;
        let cinema_id = link(self.cinema_id, "room.cinema_id")?;
        Ok((film_id, cinema_id))
    }
}

fn id_as(table: impl sea_query::Iden + 'static, id: impl sea_query::Iden + 'static, alias: &str) -> (Expr, Alias) {
    (Expr::col((table, id)), Alias::new(alias))
}

/// The statically declared join chain, without paging.
fn chain_select() -> SelectStatement {
    let mut stmt = Query::select();
    for (expr, alias) in [
        id_as(Bills::Table, Bills::Id, "bill_id"),
        id_as(Bills::Table, Bills::PaymentTime, "payment_time"),
        id_as(Bills::Table, Bills::Value, "value"),
        id_as(Bills::Table, Bills::PaymentMethod, "payment_method"),
        id_as(Bills::Table, Bills::StaffId, "staff_id"),
        id_as(Bills::Table, Bills::TicketId, "ticket_id"),
        id_as(Tickets::Table, Tickets::Id, "ticket_ref"),
        id_as(Tickets::Table, Tickets::ShowtimeSeatId, "showtime_seat_id"),
        id_as(ShowtimeSeats::Table, ShowtimeSeats::Id, "seat_ref"),
        id_as(ShowtimeSeats::Table, ShowtimeSeats::ShowtimeId, "showtime_id"),
        id_as(Showtimes::Table, Showtimes::Id, "showtime_ref"),
        id_as(Showtimes::Table, Showtimes::FilmId, "film_id"),
        id_as(Showtimes::Table, Showtimes::RoomId, "room_id"),
        id_as(Rooms::Table, Rooms::Id, "room_ref"),
        id_as(Rooms::Table, Rooms::CinemaId, "cinema_id"),
    ] {
        stmt.expr_as(expr, alias);
    }

    stmt.from(Bills::Table)
        .left_join(
            Tickets::Table,
            Expr::col((Tickets::Table, Tickets::Id)).equals((Bills::Table, Bills::TicketId)),
        )
        .left_join(
            ShowtimeSeats::Table,
            Expr::col((ShowtimeSeats::Table, ShowtimeSeats::Id))
                .equals((Tickets::Table, Tickets::ShowtimeSeatId)),
        )
        .left_join(
            Showtimes::Table,
            Expr::col((Showtimes::Table, Showtimes::Id))
                .equals((ShowtimeSeats::Table, ShowtimeSeats::ShowtimeId)),
        )
        .left_join(
            Rooms::Table,
            Expr::col((Rooms::Table, Rooms::Id)).equals((Showtimes::Table, Showtimes::RoomId)),
        )
        .to_owned()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueFact {
    pub bill_id: i32,
    pub date_id: NaiveDate,
    pub time_id: i32,
    pub film_id: i32,
    pub cinema_id: i32,
    pub value: i32,
    pub payment_method_id: i32,
    pub purchase_type_id: i32,
}

impl UpsertRow for RevenueFact {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> std::result::Result<InsertStatement, sea_query::error::Error> {
        Ok(Query::insert()
            .into_table(FactRevenue::Table)
            .columns([
                FactRevenue::BillId,
                FactRevenue::DateId,
                FactRevenue::TimeId,
                FactRevenue::FilmId,
                FactRevenue::CinemaId,
                FactRevenue::Value,
                FactRevenue::PaymentMethodId,
                FactRevenue::PurchaseTypeId,
                FactRevenue::EtlLoadedAt,
            ])
            .values([
                self.bill_id.into(),
                self.date_id.into(),
                self.time_id.into(),
                self.film_id.into(),
                self.cinema_id.into(),
                self.value.into(),
                self.payment_method_id.into(),
                self.purchase_type_id.into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(FactRevenue::BillId)
                    .update_columns([
                        FactRevenue::DateId,
                        FactRevenue::TimeId,
                        FactRevenue::FilmId,
                        FactRevenue::CinemaId,
                        FactRevenue::Value,
                        FactRevenue::PaymentMethodId,
                        FactRevenue::PurchaseTypeId,
                        FactRevenue::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

pub struct RevenueLoader;

#[async_trait]
impl IncrementalFact for RevenueLoader {
    const TABLE: &'static str = "fact_revenue";
    const AT_COLUMN: &'static str = "payment_time";
    const ID_COLUMN: &'static str = "bill_id";

    type Record = RevenueRecord;
    type State = ();
    type Fact = RevenueFact;

    async fn prepare(&self, _ctx: &FactContext<'_>) -> Result<()> {
        Ok(())
    }

    async fn fetch_page(&self, source: &Pool, page: &PageRequest) -> Result<Vec<DbRow>> {
        let stmt = chain_select()
            .cond_where(page.window(
                Expr::col((Bills::Table, Bills::PaymentTime)).into(),
                Expr::col((Bills::Table, Bills::Id)).into(),
            ))
            .order_by((Bills::Table, Bills::PaymentTime), Order::Asc)
            .order_by((Bills::Table, Bills::Id), Order::Asc)
            .limit(page.limit)
            .to_owned();

        let (sql, values) = build_query(&stmt);
        Ok(sqlx::query_with(&sql, values).fetch_all(source).await?)
    }

    fn decode(row: &DbRow, position: Cursor) -> std::result::Result<RevenueRecord, SkipReason> {
        RevenueRecord::from_row(row, position)
    }

    fn transform(
        &self,
        record: &RevenueRecord,
        _state: &(),
        dims: &DimensionIndex,
        settings: &EtlSettings,
    ) -> std::result::Result<RevenueFact, SkipReason> {
        let value = record.value.ok_or(SkipReason::MissingField("value"))?;
        let payment_method_id = settings
            .payment_methods
            .resolve(record.payment_method.as_deref())?;
        let (film_id, cinema_id) = record.resolve_chain()?;
        let purchase_type_id = PurchaseType::from_staff(record.staff_id).id();

        Ok(RevenueFact {
            bill_id: record.bill_id,
            date_id: dims.date(date_id(record.payment_time))?,
            time_id: dims.time(time_id(record.payment_time))?,
            film_id: dims.film(film_id)?,
            cinema_id: dims.cinema(cinema_id)?,
            value,
            payment_method_id: dims.payment_method(payment_method_id)?,
            purchase_type_id: dims.purchase_type(purchase_type_id)?,
        })
    }
}

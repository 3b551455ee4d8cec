//! Shared utilities for ETL integration tests.
//!
//! Provides an in-memory SQLite booking database (the tables the loaders
//! read), an initialized in-memory warehouse, and seed helpers.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use cinema_etl::etl::dimensions::{self, DimensionLoader};
use cinema_etl::etl::facts::{DimensionIndex, FactContext};
use cinema_etl::etl::{EtlSettings, LoadContext};
use cinema_etl::storage::mock::MemoryWatermarkStore;
use cinema_etl::storage::{connect_pool, init_warehouse, Pool, WatermarkStore};

pub const CASH: &str = "Thanh toán bằng tiền mặt";
pub const CARD: &str = "Thanh toán bằng thẻ tín dụng";
pub const WALLET: &str = "Thanh toán bằng ví điện tử";

/// Booking-system tables, as the CRUD backend creates them.
const SOURCE_SCHEMA: &[&str] = &[
    "CREATE TABLE films (id INTEGER PRIMARY KEY, title TEXT, description TEXT, duration INTEGER, release_date DATE, author TEXT, genre TEXT, is_active BOOLEAN, created_at TIMESTAMP)",
    "CREATE TABLE genres (id INTEGER PRIMARY KEY, name TEXT, description TEXT)",
    "CREATE TABLE cinemas (id INTEGER PRIMARY KEY, name TEXT, address TEXT, phone_number TEXT)",
    "CREATE TABLE rooms (id INTEGER PRIMARY KEY, cinema_id INTEGER)",
    "CREATE TABLE showtimes (id INTEGER PRIMARY KEY, name TEXT, start_time TIMESTAMP, film_id INTEGER, room_id INTEGER, created_at TIMESTAMP)",
    "CREATE TABLE showtime_seats (id INTEGER PRIMARY KEY, seat_status TEXT, seat_id INTEGER, showtime_id INTEGER, created_at TIMESTAMP)",
    "CREATE TABLE tickets (id INTEGER PRIMARY KEY, title TEXT, description TEXT, price INTEGER, created_at TIMESTAMP, bill_id INTEGER, showtime_seat_id INTEGER)",
    "CREATE TABLE bills (id INTEGER PRIMARY KEY, payment_method TEXT, payment_time TIMESTAMP, status TEXT, value INTEGER, staff_id INTEGER, ticket_id INTEGER, created_at TIMESTAMP)",
    "CREATE TABLE rates (id INTEGER PRIMARY KEY, point INTEGER, detail TEXT, user_id INTEGER, film_id INTEGER, created_at TIMESTAMP)",
    "CREATE TABLE promotions (id INTEGER PRIMARY KEY, name TEXT, description TEXT, duration INTEGER)",
    "CREATE TABLE bill_proms (id INTEGER PRIMARY KEY, bill_id INTEGER, prom_id INTEGER)",
];

pub fn ts(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
}

/// Watermark that precedes every seeded booking.
pub fn new_year() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Small pages so every loader crosses page boundaries; a fixed calendar
/// so results do not depend on today's date.
pub fn settings() -> EtlSettings {
    EtlSettings::default()
        .with_batch_size(2)
        .with_calendar(
            NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        )
}

pub async fn source_pool() -> Pool {
    let pool = connect_pool("sqlite::memory:", 1)
        .await
        .expect("Failed to open source database");
    for ddl in SOURCE_SCHEMA {
        sqlx::query(ddl)
            .execute(&pool)
            .await
            .expect("Failed to create source table");
    }
    pool
}

pub async fn warehouse_pool() -> Pool {
    let pool = connect_pool("sqlite::memory:", 1)
        .await
        .expect("Failed to open warehouse database");
    init_warehouse(&pool)
        .await
        .expect("Failed to create warehouse schema");
    pool
}

/// Source, warehouse and watermarks for one test.
pub struct Harness {
    pub source: Pool,
    pub warehouse: Pool,
    pub watermarks: Arc<MemoryWatermarkStore>,
    pub settings: EtlSettings,
}

impl Harness {
    pub async fn new() -> Self {
        Self {
            source: source_pool().await,
            warehouse: warehouse_pool().await,
            watermarks: Arc::new(MemoryWatermarkStore::new()),
            settings: settings(),
        }
    }

    pub fn load_ctx(&self) -> LoadContext<'_> {
        LoadContext {
            source: &self.source,
            warehouse: &self.warehouse,
            settings: &self.settings,
            loaded_at: Utc::now(),
        }
    }

    pub fn fact_ctx<'a>(&'a self, dims: &'a DimensionIndex) -> FactContext<'a> {
        self.fact_ctx_at(dims, Utc::now())
    }

    /// Fact context for a run whose dimension snapshot was taken at `loaded_at`.
    pub fn fact_ctx_at<'a>(&'a self, dims: &'a DimensionIndex, loaded_at: DateTime<Utc>) -> FactContext<'a> {
        FactContext {
            source: &self.source,
            warehouse: &self.warehouse,
            watermarks: self.watermarks.as_ref() as &dyn WatermarkStore,
            settings: &self.settings,
            dims,
            loaded_at,
        }
    }

    /// Run every dimension loader and build the index, as a run would.
    pub async fn load_dimensions(&self) -> DimensionIndex {
        let ctx = self.load_ctx();
        for loader in dimensions::default_loaders() {
            loader
                .load(&ctx)
                .await
                .unwrap_or_else(|e| panic!("{} failed: {e}", loader.table()));
        }
        DimensionIndex::load(&self.warehouse)
            .await
            .expect("Failed to build dimension index")
    }
}

// =============================================================================
// Seed data
// =============================================================================

/// Cinemas, rooms, films, genres, promotions, showtimes and seats.
///
/// - showtime 1: film 1 in room 1 (cinema 1), seats 1-4
/// - showtime 2: film 2 in room 1, seats 5-6
/// - showtime 3: film 1 in room 2, which has no cinema, seat 7
/// - showtime 4: film 2 in room 1, no seats
pub async fn seed_catalog(source: &Pool) {
    exec(source, "INSERT INTO cinemas (id, name, address, phone_number) VALUES (1, 'CGV Vincom', '72 Le Thanh Ton', '1900 6017')").await;
    exec(source, "INSERT INTO rooms (id, cinema_id) VALUES (1, 1), (2, NULL)").await;
    exec(source, "INSERT INTO genres (id, name, description) VALUES (1, 'Drama', NULL), (2, 'Sci-Fi', 'Space')").await;
    exec(source, "INSERT INTO promotions (id, name, description, duration) VALUES (1, 'Tet', 'Lunar new year', 14)").await;

    insert_film(source, 1, Some("Mai"), true).await;
    insert_film(source, 2, Some("Dune: Part Two"), false).await;

    insert_showtime(source, 1, 1, 1, ts(5, 19, 0), Utc.with_ymd_and_hms(2023, 12, 20, 8, 0, 0).unwrap()).await;
    insert_showtime(source, 2, 2, 1, ts(6, 20, 30), Utc.with_ymd_and_hms(2023, 12, 21, 8, 0, 0).unwrap()).await;
    insert_showtime(source, 3, 1, 2, ts(7, 18, 0), Utc.with_ymd_and_hms(2023, 12, 22, 8, 0, 0).unwrap()).await;
    insert_showtime(source, 4, 2, 1, ts(8, 21, 0), Utc.with_ymd_and_hms(2023, 12, 23, 8, 0, 0).unwrap()).await;

    for (seat, showtime) in [(1, 1), (2, 1), (3, 1), (4, 1), (5, 2), (6, 2), (7, 3)] {
        sqlx::query("INSERT INTO showtime_seats (id, seat_status, seat_id, showtime_id, created_at) VALUES (?, 'available', ?, ?, ?)")
            .bind(seat)
            .bind(seat)
            .bind(showtime)
            .bind(Utc.with_ymd_and_hms(2023, 12, 20, 8, 0, 0).unwrap())
            .execute(source)
            .await
            .expect("Failed to insert seat");
    }
}

pub async fn exec(pool: &Pool, sql: &str) {
    sqlx::query(sql)
        .execute(pool)
        .await
        .unwrap_or_else(|e| panic!("{sql}: {e}"));
}

pub async fn insert_film(source: &Pool, id: i32, title: Option<&str>, is_active: bool) {
    sqlx::query("INSERT INTO films (id, title, description, duration, release_date, author, genre, is_active, created_at) VALUES (?, ?, NULL, 120, ?, 'Tran Thanh', 'Drama', ?, ?)")
        .bind(id)
        .bind(title)
        .bind(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap())
        .bind(is_active)
        .bind(Utc.with_ymd_and_hms(2023, 11, 1, 0, 0, 0).unwrap())
        .execute(source)
        .await
        .expect("Failed to insert film");
}

pub async fn insert_showtime(
    source: &Pool,
    id: i32,
    film_id: i32,
    room_id: i32,
    start_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
) {
    sqlx::query("INSERT INTO showtimes (id, name, start_time, film_id, room_id, created_at) VALUES (?, ?, ?, ?, ?, ?)")
        .bind(id)
        .bind(format!("Showtime {id}"))
        .bind(start_time)
        .bind(film_id)
        .bind(room_id)
        .bind(created_at)
        .execute(source)
        .await
        .expect("Failed to insert showtime");
}

pub async fn insert_ticket(
    source: &Pool,
    id: i32,
    seat_id: Option<i32>,
    bill_id: Option<i32>,
    created_at: DateTime<Utc>,
) {
    sqlx::query("INSERT INTO tickets (id, title, description, price, created_at, bill_id, showtime_seat_id) VALUES (?, ?, NULL, 90000, ?, ?, ?)")
        .bind(id)
        .bind(format!("Ticket {id}"))
        .bind(created_at)
        .bind(bill_id)
        .bind(seat_id)
        .execute(source)
        .await
        .expect("Failed to insert ticket");
}

pub async fn insert_bill(
    source: &Pool,
    id: i32,
    ticket_id: Option<i32>,
    payment_method: Option<&str>,
    staff_id: Option<i32>,
    payment_time: DateTime<Utc>,
) {
    sqlx::query("INSERT INTO bills (id, payment_method, payment_time, status, value, staff_id, ticket_id, created_at) VALUES (?, ?, ?, 'paid', 90000, ?, ?, ?)")
        .bind(id)
        .bind(payment_method)
        .bind(payment_time)
        .bind(staff_id)
        .bind(ticket_id)
        .bind(payment_time)
        .execute(source)
        .await
        .expect("Failed to insert bill");
}

/// A ticket on `seat_id` paid by a bill with the same id, both stamped `at`.
pub async fn sell_seat(source: &Pool, id: i32, seat_id: i32, payment_method: Option<&str>, at: DateTime<Utc>) {
    insert_ticket(source, id, Some(seat_id), Some(id), at).await;
    insert_bill(source, id, Some(id), payment_method, None, at).await;
}

pub async fn insert_rate(source: &Pool, id: i32, user_id: i32, film_id: i32, point: i32, at: DateTime<Utc>) {
    sqlx::query("INSERT INTO rates (id, point, detail, user_id, film_id, created_at) VALUES (?, ?, 'ok', ?, ?, ?)")
        .bind(id)
        .bind(point)
        .bind(user_id)
        .bind(film_id)
        .bind(at)
        .execute(source)
        .await
        .expect("Failed to insert rate");
}

pub async fn count(pool: &Pool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("count {table}: {e}"))
}

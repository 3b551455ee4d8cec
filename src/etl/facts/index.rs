//! In-memory index of warehouse dimension keys.
//!
//! Built once per run after the dimension phase. Fact loaders check every
//! foreign key against it so no fact row can reference a missing dimension.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use chrono::NaiveDate;
use sea_query::{Iden, Query};
use sqlx::Row;
use tracing::debug;

use crate::error::{EtlError, Result};
use crate::etl::SkipReason;
use crate::storage::schema::{
    DimCinema, DimDate, DimFilm, DimPaymentMethod, DimPurchaseType, DimShowtime, DimTime,
};
use crate::storage::{build_query, Pool};

#[derive(Debug, Clone, Default)]
pub struct DimensionIndex {
    films: HashSet<i32>,
    cinemas: HashSet<i32>,
    showtimes: HashSet<i32>,
    payment_methods: HashSet<i32>,
    purchase_types: HashSet<i32>,
    dates: HashSet<NaiveDate>,
    times: HashSet<i32>,
}

async fn keys<K, T, C>(pool: &Pool, table: T, column: C) -> Result<HashSet<K>>
where
    K: for<'r> sqlx::Decode<'r, crate::storage::Db> + sqlx::Type<crate::storage::Db> + Eq + Hash,
    T: Iden + 'static,
    C: Iden + 'static,
{
    let stmt = Query::select().column(column).from(table).to_owned();
    let (sql, values) = build_query(&stmt);
    let rows = sqlx::query_with(&sql, values).fetch_all(pool).await?;
    rows.iter()
        .map(|row| row.try_get::<K, _>(0).map_err(EtlError::from))
        .collect()
}

fn check<K>(set: &HashSet<K>, dimension: &'static str, key: K) -> std::result::Result<K, SkipReason>
where
    K: Eq + Hash + Display,
{
    if set.contains(&key) {
        Ok(key)
    } else {
        Err(SkipReason::MissingDimension {
            dimension,
            key: key.to_string(),
        })
    }
}

impl DimensionIndex {
    /// Read every dimension key the fact loaders reference.
    pub async fn load(warehouse: &Pool) -> Result<Self> {
        let index = Self {
            films: keys(warehouse, DimFilm::Table, DimFilm::FilmId).await?,
            cinemas: keys(warehouse, DimCinema::Table, DimCinema::CinemaId).await?,
            showtimes: keys(warehouse, DimShowtime::Table, DimShowtime::ShowtimeId).await?,
            payment_methods: keys(
                warehouse,
                DimPaymentMethod::Table,
                DimPaymentMethod::PaymentMethodId,
            )
            .await?,
            purchase_types: keys(
                warehouse,
                DimPurchaseType::Table,
                DimPurchaseType::PurchaseTypeId,
            )
            .await?,
            dates: keys(warehouse, DimDate::Table, DimDate::DateId).await?,
            times: keys(warehouse, DimTime::Table, DimTime::TimeId).await?,
        };
        debug!(
            films = index.films.len(),
            cinemas = index.cinemas.len(),
            showtimes = index.showtimes.len(),
            dates = index.dates.len(),
            "Dimension index loaded"
        );
        Ok(index)
    }

    pub fn film(&self, id: i32) -> std::result::Result<i32, SkipReason> {
        check(&self.films, "dim_film", id)
    }

    pub fn cinema(&self, id: i32) -> std::result::Result<i32, SkipReason> {
        check(&self.cinemas, "dim_cinema", id)
    }

    pub fn showtime(&self, id: i32) -> std::result::Result<i32, SkipReason> {
        check(&self.showtimes, "dim_showtime", id)
    }

    pub fn payment_method(&self, id: i32) -> std::result::Result<i32, SkipReason> {
        check(&self.payment_methods, "dim_payment_method", id)
    }

    pub fn purchase_type(&self, id: i32) -> std::result::Result<i32, SkipReason> {
        check(&self.purchase_types, "dim_purchase_type", id)
    }

    pub fn date(&self, date: NaiveDate) -> std::result::Result<NaiveDate, SkipReason> {
        check(&self.dates, "dim_date", date)
    }

    pub fn time(&self, id: i32) -> std::result::Result<i32, SkipReason> {
        check(&self.times, "dim_time", id)
    }

    /// Builder used by unit tests to assemble an index without a database.
    pub fn with_films(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
        self.films.extend(ids);
        self
    }

    pub fn with_cinemas(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
        self.cinemas.extend(ids);
        self
    }

    pub fn with_showtimes(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
        self.showtimes.extend(ids);
        self
    }

    pub fn with_codes(
        mut self,
        payment_methods: impl IntoIterator<Item = i32>,
        purchase_types: impl IntoIterator<Item = i32>,
    ) -> Self {
        self.payment_methods.extend(payment_methods);
        self.purchase_types.extend(purchase_types);
        self
    }

    pub fn with_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.dates.extend(dates);
        self
    }

    /// Adds all 1440 minutes.
    pub fn with_all_times(mut self) -> Self {
        self.times.extend(0..1440);
        self
    }
}

//! `fact_film_rating`: the latest rating per (user, film).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_query::{Expr, InsertStatement, OnConflict, Order, Query};

use crate::error::Result;
use crate::etl::derive::date_id;
use crate::etl::{optional_column, Cursor, EtlSettings, PageRequest, SkipReason, UpsertRow};
use crate::storage::schema::FactFilmRating;
use crate::storage::source::Rates;
use crate::storage::{build_query, DbRow, Pool};

use super::{DimensionIndex, FactContext, IncrementalFact};

#[derive(Debug, Clone, PartialEq)]
pub struct RateRecord {
    pub rate_id: i32,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<i32>,
    pub film_id: Option<i32>,
    pub point: Option<i32>,
    pub detail: Option<String>,
}

impl RateRecord {
    fn from_row(row: &DbRow, position: Cursor) -> std::result::Result<Self, SkipReason> {
        Ok(Self {
            rate_id: position.id,
            created_at: position.at,
            user_id: optional_column(row, "user_id")?,
            film_id: optional_column(row, "film_id")?,
            point: optional_column(row, "point")?,
            detail: optional_column(row, "detail")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilmRatingFact {
    pub user_id: i32,
    pub film_id: i32,
    pub date_id: NaiveDate,
    pub point: i32,
    pub detail: Option<String>,
}

impl UpsertRow for FilmRatingFact {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> std::result::Result<InsertStatement, sea_query::error::Error> {
        Ok(Query::insert()
            .into_table(FactFilmRating::Table)
            .columns([
                FactFilmRating::UserId,
                FactFilmRating::FilmId,
                FactFilmRating::DateId,
                FactFilmRating::Point,
                FactFilmRating::Detail,
                FactFilmRating::EtlLoadedAt,
            ])
            .values([
                self.user_id.into(),
                self.film_id.into(),
                self.date_id.into(),
                self.point.into(),
                self.detail.clone().into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::columns([FactFilmRating::UserId, FactFilmRating::FilmId])
                    .update_columns([
                        FactFilmRating::DateId,
                        FactFilmRating::Point,
                        FactFilmRating::Detail,
                        FactFilmRating::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

pub struct FilmRatingLoader;

#[async_trait]
impl IncrementalFact for FilmRatingLoader {
    const TABLE: &'static str = "fact_film_rating";
    const AT_COLUMN: &'static str = "created_at";
    const ID_COLUMN: &'static str = "id";

    type Record = RateRecord;
    type State = ();
    type Fact = FilmRatingFact;

    async fn prepare(&self, _ctx: &FactContext<'_>) -> Result<()> {
        Ok(())
    }

    async fn fetch_page(&self, source: &Pool, page: &PageRequest) -> Result<Vec<DbRow>> {
        let stmt = Query::select()
            .columns([
                Rates::Id,
                Rates::CreatedAt,
                Rates::UserId,
                Rates::FilmId,
                Rates::Point,
                Rates::Detail,
            ])
            .from(Rates::Table)
            .cond_where(page.window(
                Expr::col(Rates::CreatedAt).into(),
                Expr::col(Rates::Id).into(),
            ))
            .order_by(Rates::CreatedAt, Order::Asc)
            .order_by(Rates::Id, Order::Asc)
            .limit(page.limit)
            .to_owned();

        let (sql, values) = build_query(&stmt);
        Ok(sqlx::query_with(&sql, values).fetch_all(source).await?)
    }

    fn decode(row: &DbRow, position: Cursor) -> std::result::Result<RateRecord, SkipReason> {
        RateRecord::from_row(row, position)
    }

    fn transform(
        &self,
        record: &RateRecord,
        _state: &(),
        dims: &DimensionIndex,
        _settings: &EtlSettings,
    ) -> std::result::Result<FilmRatingFact, SkipReason> {
        let user_id = record.user_id.ok_or(SkipReason::MissingField("user_id"))?;
        let film_id = record.film_id.ok_or(SkipReason::MissingField("film_id"))?;
        let point = record.point.ok_or(SkipReason::MissingField("point"))?;

        Ok(FilmRatingFact {
            user_id,
            film_id: dims.film(film_id)?,
            date_id: dims.date(date_id(record.created_at))?,
            point,
            detail: record.detail.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(film_id: Option<i32>) -> RateRecord {
        RateRecord {
            rate_id: 1,
            created_at: Utc.with_ymd_and_hms(2024, 3, 8, 9, 0, 0).unwrap(),
            user_id: Some(77),
            film_id,
            point: Some(4),
            detail: Some("good".to_string()),
        }
    }

    fn dims() -> DimensionIndex {
        DimensionIndex::default()
            .with_films([3])
            .with_dates([NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()])
    }

    #[test]
    fn test_rating_keyed_by_user_and_film() {
        let fact = FilmRatingLoader
            .transform(&record(Some(3)), &(), &dims(), &EtlSettings::default())
            .unwrap();
        assert_eq!((fact.user_id, fact.film_id), (77, 3));
        assert_eq!(fact.point, 4);
    }

    #[test]
    fn test_rating_for_unknown_film_is_skipped() {
        assert!(matches!(
            FilmRatingLoader.transform(&record(Some(9)), &(), &dims(), &EtlSettings::default()),
            Err(SkipReason::MissingDimension {
                dimension: "dim_film",
                ..
            })
        ));
        assert_eq!(
            FilmRatingLoader.transform(&record(None), &(), &dims(), &EtlSettings::default()),
            Err(SkipReason::MissingField("film_id"))
        );
    }
}

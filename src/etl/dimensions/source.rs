//! Dimensions copied from source tables.

use chrono::{DateTime, NaiveDate, Utc};
use sea_query::{ColumnRef, InsertStatement, IntoColumnRef, OnConflict, Query, SelectStatement};

use crate::etl::{optional_column, required_column, SkipReason, UpsertRow};
use crate::storage::schema::{DimCinema, DimFilm, DimGenre, DimPromotion, DimShowtime, DimTicket};
use crate::storage::source::{Cinemas, Films, Genres, Promotions, Showtimes, Tickets};
use crate::storage::DbRow;

use super::SourceDimension;

type BuildResult = std::result::Result<InsertStatement, sea_query::error::Error>;

#[derive(Debug, Clone, PartialEq)]
pub struct FilmRow {
    pub film_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<i32>,
    pub release_date: Option<NaiveDate>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub status: &'static str,
}

impl FilmRow {
    pub fn status_of(is_active: bool) -> &'static str {
        if is_active {
            "active"
        } else {
            "inactive"
        }
    }
}

impl SourceDimension for FilmRow {
    const TABLE: &'static str = "dim_film";

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                Films::Id,
                Films::Title,
                Films::Description,
                Films::Duration,
                Films::ReleaseDate,
                Films::Author,
                Films::Genre,
                Films::IsActive,
            ])
            .from(Films::Table)
            .to_owned()
    }

    fn id_column() -> ColumnRef {
        (Films::Table, Films::Id).into_column_ref()
    }

    fn from_row(row: &DbRow) -> Result<Self, SkipReason> {
        Ok(Self {
            film_id: required_column(row, "id")?,
            title: required_column(row, "title")?,
            description: optional_column(row, "description")?,
            duration: optional_column(row, "duration")?,
            release_date: optional_column(row, "release_date")?,
            author: optional_column(row, "author")?,
            genre: optional_column(row, "genre")?,
            status: Self::status_of(required_column(row, "is_active")?),
        })
    }
}

impl UpsertRow for FilmRow {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> BuildResult {
        Ok(Query::insert()
            .into_table(DimFilm::Table)
            .columns([
                DimFilm::FilmId,
                DimFilm::Title,
                DimFilm::Description,
                DimFilm::Duration,
                DimFilm::ReleaseDate,
                DimFilm::Author,
                DimFilm::Genre,
                DimFilm::Status,
                DimFilm::EtlLoadedAt,
            ])
            .values([
                self.film_id.into(),
                self.title.clone().into(),
                self.description.clone().into(),
                self.duration.into(),
                self.release_date.into(),
                self.author.clone().into(),
                self.genre.clone().into(),
                self.status.into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(DimFilm::FilmId)
                    .update_columns([
                        DimFilm::Title,
                        DimFilm::Description,
                        DimFilm::Duration,
                        DimFilm::ReleaseDate,
                        DimFilm::Author,
                        DimFilm::Genre,
                        DimFilm::Status,
                        DimFilm::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenreRow {
    pub genre_id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl SourceDimension for GenreRow {
    const TABLE: &'static str = "dim_genre";

    fn select() -> SelectStatement {
        Query::select()
            .columns([Genres::Id, Genres::Name, Genres::Description])
            .from(Genres::Table)
            .to_owned()
    }

    fn id_column() -> ColumnRef {
        (Genres::Table, Genres::Id).into_column_ref()
    }

    fn from_row(row: &DbRow) -> Result<Self, SkipReason> {
        Ok(Self {
            genre_id: required_column(row, "id")?,
            name: required_column(row, "name")?,
            description: optional_column(row, "description")?,
        })
    }
}

impl UpsertRow for GenreRow {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> BuildResult {
        Ok(Query::insert()
            .into_table(DimGenre::Table)
            .columns([
                DimGenre::GenreId,
                DimGenre::Name,
                DimGenre::Description,
                DimGenre::EtlLoadedAt,
            ])
            .values([
                self.genre_id.into(),
                self.name.clone().into(),
                self.description.clone().into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(DimGenre::GenreId)
                    .update_columns([DimGenre::Name, DimGenre::Description, DimGenre::EtlLoadedAt])
                    .to_owned(),
            )
            .to_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CinemaRow {
    pub cinema_id: i32,
    pub name: String,
    pub address: String,
    pub phone_number: String,
}

impl SourceDimension for CinemaRow {
    const TABLE: &'static str = "dim_cinema";

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                Cinemas::Id,
                Cinemas::Name,
                Cinemas::Address,
                Cinemas::PhoneNumber,
            ])
            .from(Cinemas::Table)
            .to_owned()
    }

    fn id_column() -> ColumnRef {
        (Cinemas::Table, Cinemas::Id).into_column_ref()
    }

    fn from_row(row: &DbRow) -> Result<Self, SkipReason> {
        Ok(Self {
            cinema_id: required_column(row, "id")?,
            name: required_column(row, "name")?,
            address: required_column(row, "address")?,
            phone_number: required_column(row, "phone_number")?,
        })
    }
}

impl UpsertRow for CinemaRow {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> BuildResult {
        Ok(Query::insert()
            .into_table(DimCinema::Table)
            .columns([
                DimCinema::CinemaId,
                DimCinema::Name,
                DimCinema::Address,
                DimCinema::PhoneNumber,
                DimCinema::EtlLoadedAt,
            ])
            .values([
                self.cinema_id.into(),
                self.name.clone().into(),
                self.address.clone().into(),
                self.phone_number.clone().into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(DimCinema::CinemaId)
                    .update_columns([
                        DimCinema::Name,
                        DimCinema::Address,
                        DimCinema::PhoneNumber,
                        DimCinema::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowtimeRow {
    pub showtime_id: i32,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub film_id: Option<i32>,
    pub room_id: Option<i32>,
}

impl SourceDimension for ShowtimeRow {
    const TABLE: &'static str = "dim_showtime";

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                Showtimes::Id,
                Showtimes::Name,
                Showtimes::StartTime,
                Showtimes::FilmId,
                Showtimes::RoomId,
            ])
            .from(Showtimes::Table)
            .to_owned()
    }

    fn id_column() -> ColumnRef {
        (Showtimes::Table, Showtimes::Id).into_column_ref()
    }

    fn from_row(row: &DbRow) -> Result<Self, SkipReason> {
        Ok(Self {
            showtime_id: required_column(row, "id")?,
            name: required_column(row, "name")?,
            start_time: required_column(row, "start_time")?,
            film_id: optional_column(row, "film_id")?,
            room_id: optional_column(row, "room_id")?,
        })
    }
}

impl UpsertRow for ShowtimeRow {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> BuildResult {
        Ok(Query::insert()
            .into_table(DimShowtime::Table)
            .columns([
                DimShowtime::ShowtimeId,
                DimShowtime::Name,
                DimShowtime::StartTime,
                DimShowtime::FilmId,
                DimShowtime::RoomId,
                DimShowtime::EtlLoadedAt,
            ])
            .values([
                self.showtime_id.into(),
                self.name.clone().into(),
                self.start_time.into(),
                self.film_id.into(),
                self.room_id.into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(DimShowtime::ShowtimeId)
                    .update_columns([
                        DimShowtime::Name,
                        DimShowtime::StartTime,
                        DimShowtime::FilmId,
                        DimShowtime::RoomId,
                        DimShowtime::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketRow {
    pub ticket_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub price: i32,
}

impl SourceDimension for TicketRow {
    const TABLE: &'static str = "dim_ticket";

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                Tickets::Id,
                Tickets::Title,
                Tickets::Description,
                Tickets::Price,
            ])
            .from(Tickets::Table)
            .to_owned()
    }

    fn id_column() -> ColumnRef {
        (Tickets::Table, Tickets::Id).into_column_ref()
    }

    fn from_row(row: &DbRow) -> Result<Self, SkipReason> {
        Ok(Self {
            ticket_id: required_column(row, "id")?,
            title: required_column(row, "title")?,
            description: optional_column(row, "description")?,
            price: required_column(row, "price")?,
        })
    }
}

impl UpsertRow for TicketRow {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> BuildResult {
        Ok(Query::insert()
            .into_table(DimTicket::Table)
            .columns([
                DimTicket::TicketId,
                DimTicket::Title,
                DimTicket::Description,
                DimTicket::Price,
                DimTicket::EtlLoadedAt,
            ])
            .values([
                self.ticket_id.into(),
                self.title.clone().into(),
                self.description.clone().into(),
                self.price.into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(DimTicket::TicketId)
                    .update_columns([
                        DimTicket::Title,
                        DimTicket::Description,
                        DimTicket::Price,
                        DimTicket::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromotionRow {
    pub promotion_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub duration: Option<i32>,
}

impl SourceDimension for PromotionRow {
    const TABLE: &'static str = "dim_promotion";

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                Promotions::Id,
                Promotions::Name,
                Promotions::Description,
                Promotions::Duration,
            ])
            .from(Promotions::Table)
            .to_owned()
    }

    fn id_column() -> ColumnRef {
        (Promotions::Table, Promotions::Id).into_column_ref()
    }

    fn from_row(row: &DbRow) -> Result<Self, SkipReason> {
        Ok(Self {
            promotion_id: required_column(row, "id")?,
            name: required_column(row, "name")?,
            description: optional_column(row, "description")?,
            duration: optional_column(row, "duration")?,
        })
    }
}

impl UpsertRow for PromotionRow {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> BuildResult {
        Ok(Query::insert()
            .into_table(DimPromotion::Table)
            .columns([
                DimPromotion::PromotionId,
                DimPromotion::Name,
                DimPromotion::Description,
                DimPromotion::Duration,
                DimPromotion::EtlLoadedAt,
            ])
            .values([
                self.promotion_id.into(),
                self.name.clone().into(),
                self.description.clone().into(),
                self.duration.into(),
                loaded_at.into(),
            ])?
            .on_conflict(
                OnConflict::column(DimPromotion::PromotionId)
                    .update_columns([
                        DimPromotion::Name,
                        DimPromotion::Description,
                        DimPromotion::Duration,
                        DimPromotion::EtlLoadedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::build_query;

    #[test]
    fn test_film_status_from_active_flag() {
        assert_eq!(FilmRow::status_of(true), "active");
        assert_eq!(FilmRow::status_of(false), "inactive");
    }

    #[test]
    fn test_film_upsert_keeps_nullable_columns() {
        let film = FilmRow {
            film_id: 1,
            title: "Mai".to_string(),
            description: None,
            duration: Some(131),
            release_date: None,
            author: None,
            genre: Some("Drama".to_string()),
            status: "active",
        };
        let (sql, _) = build_query(&film.upsert(Utc::now()).unwrap());
        assert!(sql.starts_with("INSERT INTO \"dim_film\""));
        assert!(sql.contains("ON CONFLICT (\"film_id\") DO UPDATE"));
    }

    #[test]
    fn test_scan_select_reads_from_source_table() {
        let (sql, _) = build_query(&ShowtimeRow::select());
        assert!(sql.contains("FROM \"showtimes\""));
        assert!(sql.contains("\"start_time\""));
    }
}

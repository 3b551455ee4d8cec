//! Warehouse schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building,
//! plus the idempotent DDL that creates the star schema.

use sea_query::{ColumnDef, ForeignKey, Iden, Index, IndexCreateStatement, Table, TableCreateStatement};

/// Watermark side table. One row per fact table.
#[derive(Iden, Clone, Copy)]
pub enum EtlMetadata {
    Table,
    TableName,
    LastLoadedTime,
    UpdatedAt,
}

// ===== DIMENSIONS =====

#[derive(Iden, Clone, Copy)]
pub enum DimPaymentMethod {
    Table,
    PaymentMethodId,
    MethodName,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum DimPurchaseType {
    Table,
    PurchaseTypeId,
    TypeName,
    Description,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum DimDate {
    Table,
    DateId,
    Day,
    Month,
    Year,
    Quarter,
    Week,
    Weekday,
    IsWeekend,
    EtlLoadedAt,
}

/// Minute-of-day dimension, `time_id = hour * 60 + minute`.
#[derive(Iden, Clone, Copy)]
pub enum DimTime {
    Table,
    TimeId,
    Hour,
    Minute,
    Period,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum DimCinema {
    Table,
    CinemaId,
    Name,
    Address,
    PhoneNumber,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum DimFilm {
    Table,
    FilmId,
    Title,
    Description,
    Duration,
    ReleaseDate,
    Author,
    Genre,
    Status,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum DimGenre {
    Table,
    GenreId,
    Name,
    Description,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum DimTicket {
    Table,
    TicketId,
    Title,
    Description,
    Price,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum DimPromotion {
    Table,
    PromotionId,
    Name,
    Description,
    Duration,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum DimShowtime {
    Table,
    ShowtimeId,
    Name,
    StartTime,
    FilmId,
    RoomId,
    EtlLoadedAt,
}

// ===== FACTS =====

#[derive(Iden, Clone, Copy)]
pub enum FactTicketAnalysis {
    Table,
    TicketId,
    BillId,
    DateId,
    TimeId,
    Price,
    PaymentMethodId,
    PurchaseTypeId,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum FactFilmRating {
    Table,
    UserId,
    FilmId,
    DateId,
    Point,
    Detail,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum FactRevenue {
    Table,
    BillId,
    DateId,
    TimeId,
    FilmId,
    CinemaId,
    Value,
    PaymentMethodId,
    PurchaseTypeId,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum FactShowtimeFillrate {
    Table,
    ShowtimeId,
    DateId,
    FilmId,
    TotalSeats,
    BookedSeats,
    FillRate,
    EtlLoadedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum FactPromotionAnalysis {
    Table,
    BillId,
    DateId,
    PromotionUsed,
    EtlLoadedAt,
}

/// Fact table names, in the order the orchestrator loads them.
pub const FACT_TABLES: [&str; 5] = [
    "fact_ticket_analysis",
    "fact_film_rating",
    "fact_revenue",
    "fact_showtime_fillrate",
    "fact_promotion_analysis",
];

fn loaded_at<T: Iden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col).timestamp_with_time_zone().not_null().to_owned()
}

/// CREATE TABLE statements for the whole warehouse, dimensions first.
pub fn warehouse_tables() -> Vec<TableCreateStatement> {
    vec![
        Table::create()
            .table(EtlMetadata::Table)
            .if_not_exists()
            .col(ColumnDef::new(EtlMetadata::TableName).text().not_null().primary_key())
            .col(ColumnDef::new(EtlMetadata::LastLoadedTime).timestamp_with_time_zone().not_null())
            .col(ColumnDef::new(EtlMetadata::UpdatedAt).timestamp_with_time_zone().not_null())
            .to_owned(),
        Table::create()
            .table(DimPaymentMethod::Table)
            .if_not_exists()
            .col(ColumnDef::new(DimPaymentMethod::PaymentMethodId).integer().not_null().primary_key())
            .col(ColumnDef::new(DimPaymentMethod::MethodName).text().not_null())
            .col(loaded_at(DimPaymentMethod::EtlLoadedAt))
            .to_owned(),
        Table::create()
            .table(DimPurchaseType::Table)
            .if_not_exists()
            .col(ColumnDef::new(DimPurchaseType::PurchaseTypeId).integer().not_null().primary_key())
            .col(ColumnDef::new(DimPurchaseType::TypeName).text().not_null())
            .col(ColumnDef::new(DimPurchaseType::Description).text())
            .col(loaded_at(DimPurchaseType::EtlLoadedAt))
            .to_owned(),
        Table::create()
            .table(DimDate::Table)
            .if_not_exists()
            .col(ColumnDef::new(DimDate::DateId).date().not_null().primary_key())
            .col(ColumnDef::new(DimDate::Day).integer().not_null())
            .col(ColumnDef::new(DimDate::Month).integer().not_null())
            .col(ColumnDef::new(DimDate::Year).integer().not_null())
            .col(ColumnDef::new(DimDate::Quarter).integer().not_null())
            .col(ColumnDef::new(DimDate::Week).integer().not_null())
            .col(ColumnDef::new(DimDate::Weekday).text().not_null())
            .col(ColumnDef::new(DimDate::IsWeekend).boolean().not_null())
            .col(loaded_at(DimDate::EtlLoadedAt))
            .to_owned(),
        Table::create()
            .table(DimTime::Table)
            .if_not_exists()
            .col(ColumnDef::new(DimTime::TimeId).integer().not_null().primary_key())
            .col(ColumnDef::new(DimTime::Hour).integer().not_null())
            .col(ColumnDef::new(DimTime::Minute).integer().not_null())
            .col(ColumnDef::new(DimTime::Period).text().not_null())
            .col(loaded_at(DimTime::EtlLoadedAt))
            .to_owned(),
        Table::create()
            .table(DimCinema::Table)
            .if_not_exists()
            .col(ColumnDef::new(DimCinema::CinemaId).integer().not_null().primary_key())
            .col(ColumnDef::new(DimCinema::Name).text().not_null())
            .col(ColumnDef::new(DimCinema::Address).text().not_null())
            .col(ColumnDef::new(DimCinema::PhoneNumber).text().not_null())
            .col(loaded_at(DimCinema::EtlLoadedAt))
            .to_owned(),
        Table::create()
            .table(DimFilm::Table)
            .if_not_exists()
            .col(ColumnDef::new(DimFilm::FilmId).integer().not_null().primary_key())
            .col(ColumnDef::new(DimFilm::Title).text().not_null())
            .col(ColumnDef::new(DimFilm::Description).text())
            .col(ColumnDef::new(DimFilm::Duration).integer())
            .col(ColumnDef::new(DimFilm::ReleaseDate).date())
            .col(ColumnDef::new(DimFilm::Author).text())
            .col(ColumnDef::new(DimFilm::Genre).text())
            .col(ColumnDef::new(DimFilm::Status).text().not_null())
            .col(loaded_at(DimFilm::EtlLoadedAt))
            .to_owned(),
        Table::create()
            .table(DimGenre::Table)
            .if_not_exists()
            .col(ColumnDef::new(DimGenre::GenreId).integer().not_null().primary_key())
            .col(ColumnDef::new(DimGenre::Name).text().not_null())
            .col(ColumnDef::new(DimGenre::Description).text())
            .col(loaded_at(DimGenre::EtlLoadedAt))
            .to_owned(),
        Table::create()
            .table(DimTicket::Table)
            .if_not_exists()
            .col(ColumnDef::new(DimTicket::TicketId).integer().not_null().primary_key())
            .col(ColumnDef::new(DimTicket::Title).text().not_null())
            .col(ColumnDef::new(DimTicket::Description).text())
            .col(ColumnDef::new(DimTicket::Price).integer().not_null())
            .col(loaded_at(DimTicket::EtlLoadedAt))
            .to_owned(),
        Table::create()
            .table(DimPromotion::Table)
            .if_not_exists()
            .col(ColumnDef::new(DimPromotion::PromotionId).integer().not_null().primary_key())
            .col(ColumnDef::new(DimPromotion::Name).text().not_null())
            .col(ColumnDef::new(DimPromotion::Description).text())
            .col(ColumnDef::new(DimPromotion::Duration).integer())
            .col(loaded_at(DimPromotion::EtlLoadedAt))
            .to_owned(),
        Table::create()
            .table(DimShowtime::Table)
            .if_not_exists()
            .col(ColumnDef::new(DimShowtime::ShowtimeId).integer().not_null().primary_key())
            .col(ColumnDef::new(DimShowtime::Name).text().not_null())
            .col(ColumnDef::new(DimShowtime::StartTime).timestamp_with_time_zone().not_null())
            .col(ColumnDef::new(DimShowtime::FilmId).integer())
            .col(ColumnDef::new(DimShowtime::RoomId).integer())
            .col(loaded_at(DimShowtime::EtlLoadedAt))
            .to_owned(),
        Table::create()
            .table(FactTicketAnalysis::Table)
            .if_not_exists()
            .col(ColumnDef::new(FactTicketAnalysis::TicketId).integer().not_null().primary_key())
            .col(ColumnDef::new(FactTicketAnalysis::BillId).integer().not_null())
            .col(ColumnDef::new(FactTicketAnalysis::DateId).date().not_null())
            .col(ColumnDef::new(FactTicketAnalysis::TimeId).integer().not_null())
            .col(ColumnDef::new(FactTicketAnalysis::Price).integer().not_null())
            .col(ColumnDef::new(FactTicketAnalysis::PaymentMethodId).integer().not_null())
            .col(ColumnDef::new(FactTicketAnalysis::PurchaseTypeId).integer().not_null())
            .col(loaded_at(FactTicketAnalysis::EtlLoadedAt))
            .foreign_key(
                ForeignKey::create()
                    .from(FactTicketAnalysis::Table, FactTicketAnalysis::DateId)
                    .to(DimDate::Table, DimDate::DateId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactTicketAnalysis::Table, FactTicketAnalysis::TimeId)
                    .to(DimTime::Table, DimTime::TimeId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactTicketAnalysis::Table, FactTicketAnalysis::PaymentMethodId)
                    .to(DimPaymentMethod::Table, DimPaymentMethod::PaymentMethodId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactTicketAnalysis::Table, FactTicketAnalysis::PurchaseTypeId)
                    .to(DimPurchaseType::Table, DimPurchaseType::PurchaseTypeId),
            )
            .to_owned(),
        Table::create()
            .table(FactFilmRating::Table)
            .if_not_exists()
            .col(ColumnDef::new(FactFilmRating::UserId).integer().not_null())
            .col(ColumnDef::new(FactFilmRating::FilmId).integer().not_null())
            .col(ColumnDef::new(FactFilmRating::DateId).date().not_null())
            .col(ColumnDef::new(FactFilmRating::Point).integer().not_null())
            .col(ColumnDef::new(FactFilmRating::Detail).text())
            .col(loaded_at(FactFilmRating::EtlLoadedAt))
            .primary_key(
                Index::create()
                    .col(FactFilmRating::UserId)
                    .col(FactFilmRating::FilmId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactFilmRating::Table, FactFilmRating::FilmId)
                    .to(DimFilm::Table, DimFilm::FilmId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactFilmRating::Table, FactFilmRating::DateId)
                    .to(DimDate::Table, DimDate::DateId),
            )
            .to_owned(),
        Table::create()
            .table(FactRevenue::Table)
            .if_not_exists()
            .col(ColumnDef::new(FactRevenue::BillId).integer().not_null().primary_key())
            .col(ColumnDef::new(FactRevenue::DateId).date().not_null())
            .col(ColumnDef::new(FactRevenue::TimeId).integer().not_null())
            .col(ColumnDef::new(FactRevenue::FilmId).integer().not_null())
            .col(ColumnDef::new(FactRevenue::CinemaId).integer().not_null())
            .col(ColumnDef::new(FactRevenue::Value).integer().not_null())
            .col(ColumnDef::new(FactRevenue::PaymentMethodId).integer().not_null())
            .col(ColumnDef::new(FactRevenue::PurchaseTypeId).integer().not_null())
            .col(loaded_at(FactRevenue::EtlLoadedAt))
            .foreign_key(
                ForeignKey::create()
                    .from(FactRevenue::Table, FactRevenue::DateId)
                    .to(DimDate::Table, DimDate::DateId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactRevenue::Table, FactRevenue::TimeId)
                    .to(DimTime::Table, DimTime::TimeId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactRevenue::Table, FactRevenue::FilmId)
                    .to(DimFilm::Table, DimFilm::FilmId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactRevenue::Table, FactRevenue::CinemaId)
                    .to(DimCinema::Table, DimCinema::CinemaId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactRevenue::Table, FactRevenue::PaymentMethodId)
                    .to(DimPaymentMethod::Table, DimPaymentMethod::PaymentMethodId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactRevenue::Table, FactRevenue::PurchaseTypeId)
                    .to(DimPurchaseType::Table, DimPurchaseType::PurchaseTypeId),
            )
            .to_owned(),
        Table::create()
            .table(FactShowtimeFillrate::Table)
            .if_not_exists()
            .col(ColumnDef::new(FactShowtimeFillrate::ShowtimeId).integer().not_null().primary_key())
            .col(ColumnDef::new(FactShowtimeFillrate::DateId).date().not_null())
            .col(ColumnDef::new(FactShowtimeFillrate::FilmId).integer().not_null())
            .col(ColumnDef::new(FactShowtimeFillrate::TotalSeats).integer().not_null())
            .col(ColumnDef::new(FactShowtimeFillrate::BookedSeats).integer().not_null())
            .col(ColumnDef::new(FactShowtimeFillrate::FillRate).double().not_null())
            .col(loaded_at(FactShowtimeFillrate::EtlLoadedAt))
            .foreign_key(
                ForeignKey::create()
                    .from(FactShowtimeFillrate::Table, FactShowtimeFillrate::ShowtimeId)
                    .to(DimShowtime::Table, DimShowtime::ShowtimeId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactShowtimeFillrate::Table, FactShowtimeFillrate::DateId)
                    .to(DimDate::Table, DimDate::DateId),
            )
            .foreign_key(
                ForeignKey::create()
                    .from(FactShowtimeFillrate::Table, FactShowtimeFillrate::FilmId)
                    .to(DimFilm::Table, DimFilm::FilmId),
            )
            .to_owned(),
        Table::create()
            .table(FactPromotionAnalysis::Table)
            .if_not_exists()
            .col(ColumnDef::new(FactPromotionAnalysis::BillId).integer().not_null().primary_key())
            .col(ColumnDef::new(FactPromotionAnalysis::DateId).date().not_null())
            .col(ColumnDef::new(FactPromotionAnalysis::PromotionUsed).boolean().not_null())
            .col(loaded_at(FactPromotionAnalysis::EtlLoadedAt))
            .foreign_key(
                ForeignKey::create()
                    .from(FactPromotionAnalysis::Table, FactPromotionAnalysis::DateId)
                    .to(DimDate::Table, DimDate::DateId),
            )
            .to_owned(),
    ]
}

/// Secondary indexes used by the mart jobs (all of them slice by date).
pub fn warehouse_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .if_not_exists()
            .name("idx_fact_ticket_analysis_date")
            .table(FactTicketAnalysis::Table)
            .col(FactTicketAnalysis::DateId)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("idx_fact_film_rating_date")
            .table(FactFilmRating::Table)
            .col(FactFilmRating::DateId)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("idx_fact_revenue_date")
            .table(FactRevenue::Table)
            .col(FactRevenue::DateId)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("idx_fact_showtime_fillrate_date")
            .table(FactShowtimeFillrate::Table)
            .col(FactShowtimeFillrate::DateId)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("idx_fact_promotion_analysis_date")
            .table(FactPromotionAnalysis::Table)
            .col(FactPromotionAnalysis::DateId)
            .to_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_created_before_facts() {
        let names: Vec<String> = warehouse_tables()
            .iter()
            .map(|t| crate::storage::build_schema(t))
            .collect();
        let first_fact = names
            .iter()
            .position(|sql| sql.contains("fact_"))
            .expect("fact tables present");
        assert!(names[..first_fact].iter().all(|sql| !sql.contains("fact_")));
        assert!(names[first_fact..]
            .iter()
            .all(|sql| sql.contains("\"fact_")));
    }

    #[test]
    fn test_fact_table_names_match_idens() {
        assert_eq!(FactRevenue::Table.to_string(), "fact_revenue");
        assert_eq!(
            FactShowtimeFillrate::Table.to_string(),
            "fact_showtime_fillrate"
        );
        assert_eq!(EtlMetadata::Table.to_string(), "etl_metadata");
        for name in FACT_TABLES {
            assert!(name.starts_with("fact_"));
        }
    }
}

//! Operational (source) schema identifiers.
//!
//! The booking database is owned by the CRUD backend; these enums only name
//! the tables and columns the loaders read. Join chains are built from these
//! identifiers, so a renamed column is a compile error rather than a
//! runtime surprise.

use sea_query::Iden;

/// `bills`: one payment, linked to the ticket it paid for.
#[derive(Iden, Clone, Copy)]
pub enum Bills {
    Table,
    Id,
    PaymentMethod,
    PaymentTime,
    Status,
    Value,
    StaffId,
    TicketId,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Tickets {
    Table,
    Id,
    Title,
    Description,
    Price,
    CreatedAt,
    BillId,
    ShowtimeSeatId,
}

#[derive(Iden, Clone, Copy)]
pub enum Rates {
    Table,
    Id,
    Point,
    Detail,
    UserId,
    FilmId,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Showtimes {
    Table,
    Id,
    Name,
    StartTime,
    FilmId,
    RoomId,
    CreatedAt,
}

/// `showtime_seats`: one seat offered for one showtime. A seat is booked
/// when a ticket references it.
#[derive(Iden, Clone, Copy)]
pub enum ShowtimeSeats {
    Table,
    Id,
    SeatStatus,
    SeatId,
    ShowtimeId,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Rooms {
    Table,
    Id,
    CinemaId,
}

#[derive(Iden, Clone, Copy)]
pub enum Films {
    Table,
    Id,
    Title,
    Description,
    Duration,
    ReleaseDate,
    Author,
    Genre,
    IsActive,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Genres {
    Table,
    Id,
    Name,
    Description,
}

#[derive(Iden, Clone, Copy)]
pub enum Cinemas {
    Table,
    Id,
    Name,
    Address,
    PhoneNumber,
}

#[derive(Iden, Clone, Copy)]
pub enum Promotions {
    Table,
    Id,
    Name,
    Description,
    Duration,
}

/// `bill_proms`: promotion applied to a bill.
#[derive(Iden, Clone, Copy)]
pub enum BillProms {
    Table,
    Id,
    BillId,
    PromId,
}

//! Row-level rejection reasons.
//!
//! A `SkipReason` never aborts a loader. The loader logs it with the source
//! id at `warn` and counts it in its [`LoadStats`](super::LoadStats).

use sqlx::Row;

use crate::storage::{Db, DbRow};

/// Why a single source record was not loaded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("required field {0} is null")]
    MissingField(&'static str),

    #[error("join link {0} is missing")]
    MissingLink(&'static str),

    #[error("payment method {0:?} is not mapped")]
    UnmappedPaymentMethod(Option<String>),

    #[error("{dimension} has no row for key {key}")]
    MissingDimension { dimension: &'static str, key: String },

    #[error("showtime has no seat records")]
    NoSeats,

    #[error("inconsistent seat counts: {booked} booked of {total}")]
    InconsistentSeats { total: i64, booked: i64 },

    #[error("column {column} could not be decoded: {message}")]
    Malformed { column: &'static str, message: String },
}

/// Unwrap a nullable value that the target row requires.
pub fn required<T>(value: Option<T>, field: &'static str) -> Result<T, SkipReason> {
    value.ok_or(SkipReason::MissingField(field))
}

/// Decode a nullable column, turning a type mismatch into a skip.
pub fn optional_column<T>(row: &DbRow, column: &'static str) -> Result<Option<T>, SkipReason>
where
    T: for<'r> sqlx::Decode<'r, Db> + sqlx::Type<Db>,
{
    row.try_get::<Option<T>, _>(column)
        .map_err(|e| SkipReason::Malformed {
            column,
            message: e.to_string(),
        })
}

/// Decode a column that must be present.
pub fn required_column<T>(row: &DbRow, column: &'static str) -> Result<T, SkipReason>
where
    T: for<'r> sqlx::Decode<'r, Db> + sqlx::Type<Db>,
{
    required(optional_column(row, column)?, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_passes_value_through() {
        assert_eq!(required(Some(5), "value"), Ok(5));
    }

    #[test]
    fn test_required_names_missing_field() {
        assert_eq!(
            required::<i32>(None, "payment_time"),
            Err(SkipReason::MissingField("payment_time"))
        );
    }

    #[test]
    fn test_reason_messages_name_the_problem() {
        let reason = SkipReason::MissingDimension {
            dimension: "dim_film",
            key: "42".to_string(),
        };
        assert_eq!(reason.to_string(), "dim_film has no row for key 42");
        assert_eq!(
            SkipReason::MissingLink("showtime.room_id").to_string(),
            "join link showtime.room_id is missing"
        );
    }
}

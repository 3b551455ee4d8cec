//! Derived attributes shared by the fact and calendar loaders.
//!
//! Everything here is pure: time bucketing, date keys, payment-method and
//! purchase-type codes, and the fill-rate computation.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};

use crate::config::PaymentMethodConfig;

use super::SkipReason;

/// Minute-of-day bucket used as the `dim_time` key (`hour * 60 + minute`).
pub fn time_id(at: DateTime<Utc>) -> i32 {
    (at.hour() * 60 + at.minute()) as i32
}

/// Date portion of a timestamp, used as the `dim_date` key.
pub fn date_id(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Coarse period label for an hour of the day.
pub fn day_period(hour: u32) -> &'static str {
    match hour {
        0..=5 => "night",
        6..=11 => "morning",
        12..=17 => "afternoon",
        _ => "evening",
    }
}

/// Calendar attributes of one `dim_date` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub day: i32,
    pub month: i32,
    pub year: i32,
    pub quarter: i32,
    /// ISO 8601 week number.
    pub week: i32,
    pub weekday: String,
    pub is_weekend: bool,
}

impl CalendarDay {
    pub fn new(date: NaiveDate) -> Self {
        let month = date.month();
        Self {
            date,
            day: date.day() as i32,
            month: month as i32,
            year: date.year(),
            quarter: ((month - 1) / 3 + 1) as i32,
            week: date.iso_week().week() as i32,
            weekday: date.format("%A").to_string(),
            is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        }
    }
}

/// How a bill was purchased: at the counter by staff, or online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PurchaseType {
    InPerson,
    Online,
}

impl PurchaseType {
    pub const ALL: [PurchaseType; 2] = [PurchaseType::InPerson, PurchaseType::Online];

    /// A bill with a staff id was sold at the counter.
    pub fn from_staff(staff_id: Option<i32>) -> Self {
        match staff_id {
            Some(_) => PurchaseType::InPerson,
            None => PurchaseType::Online,
        }
    }

    pub fn id(self) -> i32 {
        match self {
            PurchaseType::InPerson => 1,
            PurchaseType::Online => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PurchaseType::InPerson => "in-person",
            PurchaseType::Online => "online",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PurchaseType::InPerson => "Sold at the counter by a staff member",
            PurchaseType::Online => "Self-service purchase without staff",
        }
    }
}

/// Payment-method label to code mapping.
///
/// Labels are matched exactly after trimming surrounding whitespace. There
/// is no fallback code: an unknown label makes the record unloadable.
#[derive(Debug, Clone, Default)]
pub struct PaymentMethodMap {
    by_label: HashMap<String, i32>,
    entries: Vec<PaymentMethodConfig>,
}

impl PaymentMethodMap {
    pub fn new(entries: &[PaymentMethodConfig]) -> Self {
        let entries: Vec<PaymentMethodConfig> = entries
            .iter()
            .map(|e| PaymentMethodConfig {
                id: e.id,
                label: e.label.trim().to_string(),
            })
            .collect();
        let by_label = entries.iter().map(|e| (e.label.clone(), e.id)).collect();
        Self { by_label, entries }
    }

    /// Resolve a raw label from the source to its code.
    pub fn resolve(&self, label: Option<&str>) -> Result<i32, SkipReason> {
        label
            .and_then(|l| self.by_label.get(l.trim()).copied())
            .ok_or_else(|| SkipReason::UnmappedPaymentMethod(label.map(str::to_string)))
    }

    /// Entries for the `dim_payment_method` table.
    pub fn entries(&self) -> &[PaymentMethodConfig] {
        &self.entries
    }
}

/// Seat occupancy of one showtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillRate {
    pub total_seats: i32,
    pub booked_seats: i32,
    pub fill_rate: f64,
}

impl FillRate {
    /// `booked / total`, or `NoSeats` for a showtime without seat records.
    ///
    /// Counts that cannot come from a consistent seat map (negative, or more
    /// booked than offered) are rejected rather than clamped.
    pub fn compute(total: i64, booked: i64) -> Result<Self, SkipReason> {
        if total <= 0 {
            return Err(SkipReason::NoSeats);
        }
        if booked < 0 || booked > total {
            return Err(SkipReason::InconsistentSeats { total, booked });
        }
        let total_seats = i32::try_from(total).map_err(|_| SkipReason::InconsistentSeats { total, booked })?;
        let booked_seats = booked as i32;
        Ok(Self {
            total_seats,
            booked_seats,
            fill_rate: booked as f64 / total as f64,
        })
    }
}

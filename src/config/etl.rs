//! ETL behaviour configuration: batching, reload mode, code tables,
//! calendar range and schedule.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::storage::default_epoch;

/// Default number of source rows per page (and per commit).
pub const DEFAULT_BATCH_SIZE: u64 = 500;
/// Largest accepted batch size.
pub const MAX_BATCH_SIZE: u64 = 10_000;
/// Default scheduler interval: hourly.
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// Loader behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Source rows per page; each page commits as one transaction.
    pub batch_size: u64,
    /// Rescan facts from the epoch instead of the stored watermark.
    pub full_reload: bool,
    /// Watermark for tables that have never loaded.
    pub epoch: DateTime<Utc>,
    /// Known payment-method labels and their warehouse codes.
    pub payment_methods: Vec<PaymentMethodConfig>,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            full_reload: false,
            epoch: default_epoch(),
            payment_methods: default_payment_methods(),
        }
    }
}

impl EtlConfig {
    /// Batch size clamped to `1..=MAX_BATCH_SIZE`.
    pub fn effective_batch_size(&self) -> u64 {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }
}

/// One entry of the payment-method code table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentMethodConfig {
    pub id: i32,
    /// Exact label stored by the booking system (matched after trimming).
    pub label: String,
}

/// Labels written by the booking system's checkout screens.
pub fn default_payment_methods() -> Vec<PaymentMethodConfig> {
    [
        (1, "Thanh toán bằng tiền mặt"),
        (2, "Thanh toán bằng thẻ tín dụng"),
        (3, "Thanh toán bằng ví điện tử"),
    ]
    .into_iter()
    .map(|(id, label)| PaymentMethodConfig {
        id,
        label: label.to_string(),
    })
    .collect()
}

/// Range of the generated date dimension.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// First date in `dim_date`.
    pub start: NaiveDate,
    /// Days past today to pre-populate (showtimes are scheduled ahead).
    pub days_ahead: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            days_ahead: 365,
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    /// Run once immediately at startup before waiting for the first tick.
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            run_on_start: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etl_config_default() {
        let config = EtlConfig::default();
        assert_eq!(config.batch_size, 500);
        assert!(!config.full_reload);
        assert_eq!(config.epoch, default_epoch());
        assert_eq!(config.payment_methods.len(), 3);
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let mut config = EtlConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_batch_size(), 1);

        config.batch_size = 1_000_000;
        assert_eq!(config.effective_batch_size(), MAX_BATCH_SIZE);
    }

    #[test]
    fn test_calendar_default_starts_2020() {
        let calendar = CalendarConfig::default();
        assert_eq!(calendar.start.to_string(), "2020-01-01");
        assert_eq!(calendar.days_ahead, 365);
    }
}

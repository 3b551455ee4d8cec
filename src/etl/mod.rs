//! Incremental ETL from the booking database into the star schema.
//!
//! Dimensions are refreshed in full every run; facts are loaded
//! incrementally behind per-table watermarks. Both commit per page and
//! upsert by natural key, so any run can be repeated safely.

pub mod batch;
pub mod derive;
pub mod dimensions;
pub mod facts;
mod orchestrator;
mod skip;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_query::InsertStatement;

use crate::config::Config;
use crate::storage::Pool;

pub use batch::{Cursor, LoadStats, PageRequest};
pub use derive::PaymentMethodMap;
pub use orchestrator::{EtlOrchestrator, LoaderOutcome, LoaderReport, RunReport, RunStatus};
pub use skip::{optional_column, required, required_column, SkipReason};

/// Runtime settings shared by every loader in a run.
#[derive(Debug, Clone)]
pub struct EtlSettings {
    /// Rows per page and per transaction.
    pub batch_size: u64,
    /// Rescan facts from `epoch`, ignoring stored watermarks.
    pub full_reload: bool,
    pub epoch: DateTime<Utc>,
    pub payment_methods: PaymentMethodMap,
    /// Inclusive range of the generated date dimension.
    pub calendar_start: NaiveDate,
    pub calendar_end: NaiveDate,
}

impl EtlSettings {
    /// Resolve settings from configuration. The calendar end is computed
    /// relative to today.
    pub fn from_config(config: &Config) -> Self {
        let today = Utc::now().date_naive();
        Self {
            batch_size: config.etl.effective_batch_size(),
            full_reload: config.etl.full_reload,
            epoch: config.etl.epoch,
            payment_methods: PaymentMethodMap::new(&config.etl.payment_methods),
            calendar_start: config.calendar.start,
            calendar_end: today + Duration::days(i64::from(config.calendar.days_ahead)),
        }
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_full_reload(mut self, full_reload: bool) -> Self {
        self.full_reload = full_reload;
        self
    }

    pub fn with_calendar(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.calendar_start = start;
        self.calendar_end = end;
        self
    }
}

impl Default for EtlSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Borrowed handles every loader runs against.
#[derive(Clone, Copy)]
pub struct LoadContext<'a> {
    pub source: &'a Pool,
    pub warehouse: &'a Pool,
    pub settings: &'a EtlSettings,
    /// Stamped into `etl_loaded_at` of every row written this run.
    pub loaded_at: DateTime<Utc>,
}

/// A warehouse row that knows how to merge itself by natural key.
pub trait UpsertRow {
    fn upsert(&self, loaded_at: DateTime<Utc>) -> Result<InsertStatement, sea_query::error::Error>;
}

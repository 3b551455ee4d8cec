//! cinema-etl - incremental warehouse loader for the cinema booking system
//!
//! Extracts changed rows from the operational booking database, reshapes
//! them into a star schema and merges them into the warehouse. Per-table
//! watermarks make every run incremental; natural-key upserts make every run
//! repeatable.

pub mod config;
pub mod error;
pub mod etl;
pub mod storage;
pub mod utils;

pub use error::{EtlError, Result};
pub use etl::{EtlOrchestrator, EtlSettings, RunReport, RunStatus};

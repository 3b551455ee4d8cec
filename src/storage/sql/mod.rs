//! SQL storage implementations.
//!
//! Statements are built with sea-query and bound through sea-query-binder,
//! so the same code runs against whichever backend is compiled in.

mod watermark_store;

pub use watermark_store::SqlWatermarkStore;

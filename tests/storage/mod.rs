//! Shared storage integration tests.
//!
//! Tests the WatermarkStore interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod watermark_store_tests;

//! Mock storage implementations for testing.

mod watermark_store;

pub use watermark_store::MemoryWatermarkStore;

#[cfg(test)]
mod tests;

//! Implementations of the rate-series cache port.

pub mod file;
pub mod memory;

pub use file::FileSeriesCache;
pub use memory::MemorySeriesCache;

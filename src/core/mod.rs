//! Core domain types, ports and engines

pub mod cache;
pub mod compare;
pub mod config;
pub mod currency;
pub mod error;
pub mod fixed_income;
pub mod instrument;
pub mod log;
pub mod performance;
pub mod price;
pub mod rates;
pub mod series;

// Re-export main types for cleaner imports
pub use cache::{CacheEntry, SeriesCache};
pub use error::{AnalysisError, Reason};
pub use price::MarketFeed;
pub use rates::{RateSeries, RateSeriesProvider, RateSource};

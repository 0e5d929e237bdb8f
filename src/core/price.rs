//! Market feed abstraction

use crate::core::error::Result;
use crate::core::series::TimeSeries;
use async_trait::async_trait;
use chrono::NaiveDate;

/// One remote query against a daily price feed.
///
/// Implementations perform a single time-bounded attempt; retrying is the
/// job of [`crate::providers::fetcher::SeriesFetcher`].
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Daily rows for `symbol` between `start` and `end`, both inclusive.
    async fn history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries>;

    /// The most recent close known for `symbol`.
    async fn latest_close(&self, symbol: &str) -> Result<f64>;
}

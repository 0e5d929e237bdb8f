//! Retrying access to a market feed.

use crate::core::error::Result;
use crate::core::price::MarketFeed;
use crate::core::series::TimeSeries;
use crate::providers::util::with_retry;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument};

/// Wraps a [`MarketFeed`] with bounded retry on transient failures.
///
/// Nothing is cached at this layer.
pub struct SeriesFetcher {
    feed: Arc<dyn MarketFeed>,
    attempts: usize,
    backoff_ms: u64,
}

impl SeriesFetcher {
    pub fn new(feed: Arc<dyn MarketFeed>, attempts: usize, backoff_ms: u64) -> Self {
        Self {
            feed,
            attempts,
            backoff_ms,
        }
    }

    /// Daily series for `symbol`; an empty response is `NotFound` and is not retried.
    #[instrument(name = "SeriesFetch", skip(self), fields(symbol = %symbol))]
    pub async fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
        let series = with_retry(
            || self.feed.history(symbol, start, end),
            self.attempts,
            self.backoff_ms,
        )
        .await?;
        info!("Fetched {} rows for {symbol}", series.len());
        Ok(series)
    }
}

#[async_trait]
impl MarketFeed for SeriesFetcher {
    async fn history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
        self.fetch(symbol, start, end).await
    }

    async fn latest_close(&self, symbol: &str) -> Result<f64> {
        with_retry(
            || self.feed.latest_close(symbol),
            self.attempts,
            self.backoff_ms,
        )
        .await
    }
}

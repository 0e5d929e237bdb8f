//! Conversion of foreign-currency series into the target currency.

use crate::core::price::MarketFeed;
use crate::core::series::TimeSeries;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Converts series quoted in `from` into `to` using historical exchange rates.
pub struct CurrencyNormalizer<'a> {
    feed: &'a dyn MarketFeed,
    from: String,
    to: String,
}

impl<'a> CurrencyNormalizer<'a> {
    pub fn new(feed: &'a dyn MarketFeed, from: &str, to: &str) -> Self {
        Self {
            feed,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Feed symbol of the exchange-rate pair.
    pub fn pair_symbol(&self) -> String {
        format!("{}{}=X", self.from, self.to)
    }

    /// Converts every price field of `series`; never fails.
    ///
    /// Falls back to a flat latest rate when no historical rate lines up with
    /// the series, and to the unconverted series when even that is missing.
    pub async fn to_target(&self, series: &TimeSeries, start: NaiveDate, end: NaiveDate) -> TimeSeries {
        let symbol = self.pair_symbol();
        debug!(
            "Attempting currency conversion ({} -> {}) via {symbol}",
            self.from, self.to
        );

        match self.feed.history(&symbol, start, end).await {
            Ok(rates) if !rates.is_empty() => {
                if let Some(aligned) = align_rates(series, &rates) {
                    let mean = aligned.iter().sum::<f64>() / aligned.len().max(1) as f64;
                    info!("Converted {} rows at a mean rate of {mean:.4}", series.len());
                    let mut factors = aligned.into_iter();
                    return series.map_quotes(|q| q.scaled(factors.next().unwrap_or(1.0)));
                }
                warn!("Exchange rates for {symbol} share no date with the series");
            }
            Ok(_) => warn!("No exchange rates returned for {symbol}"),
            Err(e) => warn!("Exchange rate history for {symbol} failed: {e}"),
        }

        match self.feed.latest_close(&symbol).await {
            Ok(rate) => {
                info!("Using flat rate {rate:.4} for {symbol}");
                series.map_quotes(|q| q.scaled(rate))
            }
            Err(e) => {
                warn!(
                    "Currency conversion from {} to {} failed: {e}; keeping unconverted values",
                    self.from, self.to
                );
                series.clone()
            }
        }
    }
}

/// Exchange rate for every date of `series`.
///
/// Rates are matched on exact dates, then forward-filled and finally
/// backward-filled to cover a leading gap. `None` when no date matches.
fn align_rates(series: &TimeSeries, rates: &TimeSeries) -> Option<Vec<f64>> {
    let by_date: HashMap<NaiveDate, f64> = rates
        .quotes()
        .iter()
        .filter(|q| q.close.is_finite())
        .map(|q| (q.date, q.close))
        .collect();

    let mut last = None;
    let forward: Vec<Option<f64>> = series
        .dates()
        .map(|date| {
            if let Some(rate) = by_date.get(&date) {
                last = Some(*rate);
            }
            last
        })
        .collect();

    let first_known = forward.iter().flatten().next().copied()?;
    Some(
        forward
            .into_iter()
            .map(|rate| rate.unwrap_or(first_known))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{AnalysisError, Reason, Result};
    use crate::core::series::Quote;
    use async_trait::async_trait;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
    }

    fn closes(rows: &[(u32, f64)]) -> TimeSeries {
        TimeSeries::from_quotes(rows.iter().map(|(d, c)| Quote::uniform(day(*d), *c)))
    }

    struct MockFeed {
        history: Option<TimeSeries>,
        latest: Option<f64>,
    }

    #[async_trait]
    impl MarketFeed for MockFeed {
        async fn history(&self, symbol: &str, _: NaiveDate, _: NaiveDate) -> Result<TimeSeries> {
            assert_eq!(symbol, "USDBRL=X");
            self.history
                .clone()
                .ok_or_else(|| AnalysisError::transient(Reason::Connectivity, "timed out"))
        }

        async fn latest_close(&self, _: &str) -> Result<f64> {
            self.latest
                .ok_or_else(|| AnalysisError::not_found(Reason::EmptyResponse, "no rate"))
        }
    }

    #[tokio::test]
    async fn test_forward_and_backward_fill() {
        let feed = MockFeed {
            history: Some(closes(&[(2, 5.0), (4, 6.0)])),
            latest: None,
        };
        let normalizer = CurrencyNormalizer::new(&feed, "USD", "BRL");
        let series = closes(&[(1, 10.0), (2, 10.0), (3, 10.0), (4, 10.0), (5, 10.0)]);

        let converted = normalizer.to_target(&series, day(1), day(5)).await;
        let values: Vec<f64> = converted.closes().collect();
        // day 1 back-filled, day 3 and 5 forward-filled
        assert_eq!(values, vec![50.0, 50.0, 50.0, 60.0, 60.0]);
        assert_eq!(converted.dates().collect::<Vec<_>>(), series.dates().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_all_price_fields_are_scaled() {
        let feed = MockFeed {
            history: Some(closes(&[(1, 2.0)])),
            latest: None,
        };
        let normalizer = CurrencyNormalizer::new(&feed, "USD", "BRL");
        let series = TimeSeries::from_quotes(vec![Quote {
            date: day(1),
            open: 1.0,
            high: 3.0,
            low: 0.5,
            close: 2.0,
            adj_close: 1.5,
            volume: 7,
        }]);

        let q = normalizer.to_target(&series, day(1), day(1)).await.quotes()[0];
        assert_eq!((q.open, q.high, q.low, q.close, q.adj_close), (2.0, 6.0, 1.0, 4.0, 3.0));
        assert_eq!(q.volume, 7);
    }

    #[tokio::test]
    async fn test_flat_rate_fallback_on_empty_history() {
        let feed = MockFeed {
            history: Some(TimeSeries::default()),
            latest: Some(5.0),
        };
        let normalizer = CurrencyNormalizer::new(&feed, "USD", "BRL");
        let series = closes(&[(1, 1.0), (2, 2.0)]);

        let converted = normalizer.to_target(&series, day(1), day(2)).await;
        assert_eq!(converted.closes().collect::<Vec<_>>(), vec![5.0, 10.0]);
    }

    #[tokio::test]
    async fn test_flat_rate_fallback_when_no_date_matches() {
        let feed = MockFeed {
            history: Some(closes(&[(20, 4.0)])),
            latest: Some(3.0),
        };
        let normalizer = CurrencyNormalizer::new(&feed, "USD", "BRL");
        let series = closes(&[(1, 1.0)]);

        let converted = normalizer.to_target(&series, day(1), day(1)).await;
        assert_eq!(converted.closes().collect::<Vec<_>>(), vec![3.0]);
    }

    #[tokio::test]
    async fn test_degraded_mode_returns_input_unchanged() {
        let feed = MockFeed {
            history: None,
            latest: None,
        };
        let normalizer = CurrencyNormalizer::new(&feed, "USD", "BRL");
        let series = closes(&[(1, 1.0), (2, 2.0)]);

        let converted = normalizer.to_target(&series, day(1), day(2)).await;
        assert_eq!(converted, series);
    }
}

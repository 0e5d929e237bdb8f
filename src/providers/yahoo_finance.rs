use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::error::{AnalysisError, Reason, Result};
use crate::core::price::MarketFeed;
use crate::core::series::{Quote, TimeSeries};
use crate::providers::util::{from_status, from_transport};

/// Daily quotes from the Yahoo Finance chart API.
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooFinanceProvider {
    /// Provider whose every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("assetcmp/1.0")
            .timeout(timeout)
            .build()?;
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn chart(&self, symbol: &str, query: &str) -> Result<ChartItem> {
        let url = format!("{}/v8/finance/chart/{}?{}", self.base_url, symbol, query);
        debug!("Requesting chart data from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| from_transport(&e, symbol))?;
        if !response.status().is_success() {
            return Err(from_status(response.status(), symbol));
        }

        let data = response
            .json::<ChartResponse>()
            .await
            .map_err(|e| from_transport(&e, symbol))?;
        if let Some(err) = data.chart.error {
            let reason = Reason::classify(&format!("{} {}", err.code, err.description));
            return Err(AnalysisError::not_found(
                reason,
                format!("{symbol}: {}", err.description),
            ));
        }

        data.chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| {
                AnalysisError::not_found(Reason::EmptyResponse, format!("no data for {symbol}"))
            })
    }
}

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(alias = "gmtoffset", default)]
    gmt_offset: i64,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
    #[serde(default)]
    adjclose: Vec<AdjCloseColumn>,
}

#[derive(Deserialize, Debug, Default)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug)]
struct AdjCloseColumn {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Rows of a chart item dated in exchange time; rows without a close are dropped.
fn to_quotes(item: &ChartItem) -> Vec<Quote> {
    let (Some(timestamps), Some(indicators)) = (item.timestamp.as_ref(), item.indicators.as_ref())
    else {
        return Vec::new();
    };
    let Some(columns) = indicators.quote.first() else {
        return Vec::new();
    };
    let adjclose = indicators.adjclose.first().map(|c| c.adjclose.as_slice());
    let at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let close = at(&columns.close, i)?;
            let date = DateTime::from_timestamp(ts + item.meta.gmt_offset, 0)?.date_naive();
            Some(Quote {
                date,
                open: at(&columns.open, i).unwrap_or(close),
                high: at(&columns.high, i).unwrap_or(close),
                low: at(&columns.low, i).unwrap_or(close),
                close,
                adj_close: adjclose.and_then(|c| at(c, i)).unwrap_or(close),
                volume: at(&columns.volume, i).unwrap_or(0.0).max(0.0) as u64,
            })
        })
        .collect()
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[async_trait]
impl MarketFeed for YahooFinanceProvider {
    #[instrument(name = "YahooHistoryFetch", skip(self), fields(symbol = %symbol))]
    async fn history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
        let until = end.checked_add_days(Days::new(1)).unwrap_or(end);
        let query = format!(
            "period1={}&period2={}&interval=1d&events=history",
            unix_midnight(start),
            unix_midnight(until)
        );
        let item = self.chart(symbol, &query).await?;

        let series = TimeSeries::from_quotes(
            to_quotes(&item)
                .into_iter()
                .filter(|q| q.date >= start && q.date <= end),
        );
        if series.is_empty() {
            return Err(AnalysisError::not_found(
                Reason::EmptyResponse,
                format!("no rows for {symbol} between {start} and {end}"),
            ));
        }
        debug!("Parsed {} rows for {symbol}", series.len());
        Ok(series)
    }

    #[instrument(name = "YahooLatestFetch", skip(self), fields(symbol = %symbol))]
    async fn latest_close(&self, symbol: &str) -> Result<f64> {
        let item = self.chart(symbol, "range=1d&interval=1d").await?;
        item.meta.regular_market_price.ok_or_else(|| {
            AnalysisError::not_found(
                Reason::EmptyResponse,
                format!("no market price for {symbol}"),
            )
        })
    }
}

//! Paginated, cache-backed retrieval of reference-rate series.

use async_trait::async_trait;
use chrono::{Days, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::core::cache::{CacheEntry, SeriesCache};
use crate::core::error::{AnalysisError, Reason, Result};
use crate::core::rates::{RateSeries, RateSeriesProvider, RateSource};
use crate::core::series::{RateObservation, within};

/// Splits `[start, end]` into consecutive inclusive windows of at most
/// `segment_days + 1` days. Empty when `start > end`.
pub fn segments(start: NaiveDate, end: NaiveDate, segment_days: u64) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let window_end = cursor
            .checked_add_days(Days::new(segment_days))
            .map_or(end, |d| d.min(end));
        windows.push((cursor, window_end));
        match window_end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    windows
}

/// Sorts by date and keeps the first occurrence of every date.
fn dedup_first(mut observations: Vec<RateObservation>) -> Vec<RateObservation> {
    observations.sort_by_key(|o| o.date);
    observations.dedup_by_key(|o| o.date);
    observations
}

/// Union of two series; `preferred` wins on shared dates.
fn merge(preferred: &[RateObservation], other: Vec<RateObservation>) -> Vec<RateObservation> {
    let mut by_date: BTreeMap<NaiveDate, f64> = other.into_iter().map(|o| (o.date, o.value)).collect();
    by_date.extend(preferred.iter().map(|o| (o.date, o.value)));
    by_date
        .into_iter()
        .map(|(date, value)| RateObservation { date, value })
        .collect()
}

/// Retrieves rate series window by window, persisting what it fetches.
pub struct RateSeriesFetcher {
    source: Arc<dyn RateSource>,
    cache: Arc<dyn SeriesCache>,
    segment_days: u64,
    freshness: Duration,
}

impl RateSeriesFetcher {
    pub fn new(
        source: Arc<dyn RateSource>,
        cache: Arc<dyn SeriesCache>,
        segment_years: u32,
        freshness_days: i64,
    ) -> Self {
        Self {
            source,
            cache,
            segment_days: 365 * u64::from(segment_years.max(1)),
            freshness: Duration::days(freshness_days),
        }
    }

    /// Fetches `[start, end]` for `code`, one window at a time.
    ///
    /// A failing window is logged and skipped; the call fails only when no
    /// window yields anything.
    pub async fn fetch_paginated(
        &self,
        code: u32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateObservation>> {
        let windows = segments(start, end, self.segment_days);
        debug!("Fetching series {code} in {} windows", windows.len());

        let mut collected = Vec::new();
        for (window_start, window_end) in windows {
            match self.source.fetch_window(code, window_start, window_end).await {
                Ok(rows) => {
                    debug!("Window {window_start}..{window_end}: {} rows", rows.len());
                    collected.extend(rows);
                }
                Err(e) => warn!("Skipping window {window_start}..{window_end} of series {code}: {e}"),
            }
        }

        if collected.is_empty() {
            return Err(AnalysisError::not_found(
                Reason::EmptyResponse,
                format!("series {code} returned no data between {start} and {end}"),
            ));
        }
        Ok(dedup_first(collected))
    }

    async fn load_cached(&self, name: &str) -> Option<CacheEntry> {
        match self.cache.load(name).await {
            Ok(entry) => entry.filter(|e| !e.observations.is_empty()),
            Err(e) => {
                warn!("Ignoring unreadable cache for {name}: {e:#}");
                None
            }
        }
    }

    async fn persist(&self, name: &str, observations: &[RateObservation]) {
        if let Err(e) = self.cache.store(name, observations, Utc::now()).await {
            warn!("Failed to persist {name} cache: {e:#}");
        }
    }
}

#[async_trait]
impl RateSeriesProvider for RateSeriesFetcher {
    #[instrument(name = "RateSeriesFetch", skip(self), fields(series = %series))]
    async fn fetch_rate_series(
        &self,
        series: RateSeries,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateObservation>> {
        let name = series.cache_name();
        let cached = self.load_cached(name).await;

        if let Some(entry) = cached
            .as_ref()
            .filter(|e| e.is_fresh(self.freshness, Utc::now()))
            .filter(|e| e.first_date().is_some_and(|first| first <= start))
        {
            let last = entry.last_date().unwrap_or(start);
            if last >= end {
                info!("Using cached {series} series");
                return Ok(within(&entry.observations, start, end));
            }

            let tail_start = last.succ_opt().unwrap_or(last);
            info!("Updating cached {series} series from {tail_start}");
            match self.fetch_paginated(series.code(), tail_start, end).await {
                Ok(tail) => {
                    let merged = merge(&entry.observations, tail);
                    self.persist(name, &merged).await;
                    return Ok(within(&merged, start, end));
                }
                Err(e) => {
                    warn!("No new {series} observations after {last}: {e}");
                    return Ok(within(&entry.observations, start, end));
                }
            }
        }

        info!("Fetching {series} series from {start} to {end}");
        let fetched = self.fetch_paginated(series.code(), start, end).await?;
        // A stale entry is superseded by the refetch; a fresh one that merely
        // starts late keeps its own rows.
        let merged = match cached {
            Some(entry) if entry.is_fresh(self.freshness, Utc::now()) => {
                merge(&entry.observations, fetched)
            }
            Some(entry) => merge(&fetched, entry.observations),
            None => fetched,
        };
        self.persist(name, &merged).await;
        Ok(within(&merged, start, end))
    }
}

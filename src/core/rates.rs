//! Reference-rate series abstractions

use crate::core::error::Result;
use crate::core::series::RateObservation;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::Display;

/// Reference-rate series published by the central bank time-series service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateSeries {
    /// Interbank overnight rate.
    Cdi,
    /// Monetary policy rate.
    Selic,
    /// Reference rate added on top of savings accruals.
    Tr,
}

impl RateSeries {
    /// Code of the series in the upstream service.
    pub fn code(&self) -> u32 {
        match self {
            RateSeries::Cdi => 12,
            RateSeries::Selic => 432,
            RateSeries::Tr => 226,
        }
    }

    /// Name under which the series is cached.
    pub fn cache_name(&self) -> &'static str {
        match self {
            RateSeries::Cdi => "cdi",
            RateSeries::Selic => "selic",
            RateSeries::Tr => "tr",
        }
    }
}

impl Display for RateSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateSeries::Cdi => "CDI",
                RateSeries::Selic => "SELIC",
                RateSeries::Tr => "TR",
            }
        )
    }
}

/// A single window query against the rate-series service.
///
/// The service rejects windows wider than an undocumented limit, so callers
/// keep every request well below it. An `Err` means the window produced
/// nothing usable; it never aborts a paginated fetch on its own.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_window(
        &self,
        code: u32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateObservation>>;
}

/// Retrieval of a whole reference-rate series over an arbitrary range.
#[async_trait]
pub trait RateSeriesProvider: Send + Sync {
    async fn fetch_rate_series(
        &self,
        series: RateSeries,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateObservation>>;
}

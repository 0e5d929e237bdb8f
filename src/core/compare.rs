//! Composition of fetching, conversion and analysis per comparison mode.

use crate::core::currency::CurrencyNormalizer;
use crate::core::error::{AnalysisError, Reason, Result};
use crate::core::fixed_income::FixedIncomeProvider;
use crate::core::instrument::{InstrumentKind, InstrumentRef, validate_pair};
use crate::core::performance::{
    PeriodSummary, SuperationInterval, WindowSummary, detect_superation_intervals,
    percent_variation, rolling_return, summarize_period, summarize_windows,
};
use crate::core::price::MarketFeed;
use crate::core::rates::RateSeriesProvider;
use crate::core::series::{RollingReturnSeries, TimeSeries, VariationSeries};
use chrono::{Days, NaiveDate};
use tracing::{debug, info, instrument};

pub const MAX_YEARS: u32 = 30;

/// A resolved instrument and its daily series in the target currency.
#[derive(Debug, Clone)]
pub struct InstrumentData {
    pub instrument: InstrumentRef,
    pub label: String,
    pub series: TimeSeries,
    pub converted: bool,
}

#[derive(Debug, Clone)]
pub struct PeriodComparison {
    pub first: InstrumentData,
    pub second: InstrumentData,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub variation_a: VariationSeries,
    pub variation_b: VariationSeries,
    pub intervals: Vec<SuperationInterval>,
    pub summary: PeriodSummary,
}

#[derive(Debug, Clone)]
pub struct WindowComparison {
    pub first: InstrumentData,
    pub second: InstrumentData,
    pub years: u32,
    pub window_months: u32,
    /// First window-end date kept for analysis.
    pub display_from: NaiveDate,
    pub returns_a: RollingReturnSeries,
    pub returns_b: RollingReturnSeries,
    pub intervals: Vec<SuperationInterval>,
    pub summary: WindowSummary,
}

/// Runs point-to-point and rolling-window comparisons of two instruments.
pub struct ComparisonOrchestrator<'a> {
    market: &'a dyn MarketFeed,
    rates: &'a dyn RateSeriesProvider,
    source_currency: String,
    target_currency: String,
}

impl<'a> ComparisonOrchestrator<'a> {
    /// `market` is expected to retry on its own, e.g. a
    /// [`crate::providers::fetcher::SeriesFetcher`].
    pub fn new(
        market: &'a dyn MarketFeed,
        rates: &'a dyn RateSeriesProvider,
        source_currency: &str,
        target_currency: &str,
    ) -> Self {
        Self {
            market,
            rates,
            source_currency: source_currency.to_string(),
            target_currency: target_currency.to_string(),
        }
    }

    /// Fetches one instrument over `[start, end]`, converting it when quoted
    /// in the source currency.
    #[instrument(name = "LoadInstrument", skip(self), fields(symbol = %instrument.symbol))]
    pub async fn load_instrument(
        &self,
        instrument: &InstrumentRef,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<InstrumentData> {
        let (series, converted) = match instrument.kind {
            InstrumentKind::FixedIncome(kind) => (
                FixedIncomeProvider::new(self.rates)
                    .resolve(kind, start, end)
                    .await?,
                false,
            ),
            InstrumentKind::Market => {
                let raw = self.market.history(&instrument.symbol, start, end).await?;
                if instrument.needs_conversion(&self.source_currency) {
                    let normalizer = CurrencyNormalizer::new(
                        self.market,
                        &self.source_currency,
                        &self.target_currency,
                    );
                    (normalizer.to_target(&raw, start, end).await, true)
                } else {
                    (raw, false)
                }
            }
        };

        let label = instrument.display_name(&self.source_currency, &self.target_currency);
        debug!("{label}: {} rows", series.len());
        Ok(InstrumentData {
            instrument: instrument.clone(),
            label,
            series,
            converted,
        })
    }

    async fn load_pair(
        &self,
        first: &str,
        second: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(InstrumentData, InstrumentData)> {
        let a = InstrumentRef::parse(first)?;
        let b = InstrumentRef::parse(second)?;
        validate_pair(&a, &b)?;

        let first = self.load_instrument(&a, start, end).await?;
        let second = self.load_instrument(&b, start, end).await?;
        Ok((first, second))
    }

    /// Compares percent variation from `start` to `end`.
    pub async fn compare_period(
        &self,
        first: &str,
        second: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PeriodComparison> {
        if start >= end {
            return Err(AnalysisError::invalid_input(
                Reason::InvalidArgument,
                format!("start date {start} must be before end date {end}"),
            ));
        }
        info!("Comparing {first} and {second} from {start} to {end}");
        let (a, b) = self.load_pair(first, second, start, end).await?;

        let variation_a = percent_variation(&a.series)?;
        let variation_b = percent_variation(&b.series)?;
        let intervals = detect_superation_intervals(&variation_a, &variation_b);
        let summary = summarize_period(&a.series, &b.series, &variation_a, &variation_b, &intervals);
        info!(
            "{} superation intervals covering {} days",
            summary.superation_count, summary.superation_days
        );

        Ok(PeriodComparison {
            first: a,
            second: b,
            start,
            end,
            variation_a,
            variation_b,
            intervals,
            summary,
        })
    }

    /// Compares `window_months` rolling returns over the `years` before `today`.
    ///
    /// Data is fetched from `window_months` earlier than the analysed range so
    /// the first displayed window is complete.
    pub async fn compare_windows(
        &self,
        first: &str,
        second: &str,
        years: u32,
        window_months: u32,
        today: NaiveDate,
    ) -> Result<WindowComparison> {
        validate_window(years, window_months)?;
        let (fetch_from, display_from) = window_range(years, window_months, today)?;
        info!(
            "Comparing {window_months}-month windows of {first} and {second} over {years} years"
        );
        let (a, b) = self.load_pair(first, second, fetch_from, today).await?;

        let returns_a = rolling_return(&a.series, window_months).since(display_from);
        let returns_b = rolling_return(&b.series, window_months).since(display_from);
        for (data, returns) in [(&a, &returns_a), (&b, &returns_b)] {
            if returns.is_empty() {
                return Err(AnalysisError::computation(
                    Reason::InsufficientHistory,
                    format!(
                        "{} has {} rows, too few for {window_months}-month windows since {display_from}",
                        data.label,
                        data.series.len()
                    ),
                ));
            }
        }

        let intervals = detect_superation_intervals(&returns_a, &returns_b);
        let summary = summarize_windows(&returns_a, &returns_b, &intervals);
        info!(
            "{} aligned windows, {} superation intervals",
            summary.aligned_windows, summary.superation_count
        );

        Ok(WindowComparison {
            first: a,
            second: b,
            years,
            window_months,
            display_from,
            returns_a,
            returns_b,
            intervals,
            summary,
        })
    }
}

/// Rejects analysis lengths outside `1..=30` years and windows outside
/// `1..=years*12` months.
pub fn validate_window(years: u32, window_months: u32) -> Result<()> {
    if !(1..=MAX_YEARS).contains(&years) {
        return Err(AnalysisError::invalid_input(
            Reason::InvalidArgument,
            format!("years must be between 1 and {MAX_YEARS}, got {years}"),
        ));
    }
    if !(1..=years * 12).contains(&window_months) {
        return Err(AnalysisError::invalid_input(
            Reason::InvalidArgument,
            format!(
                "window must be between 1 and {} months, got {window_months}",
                years * 12
            ),
        ));
    }
    Ok(())
}

/// Fetch start and display start of a rolling-window analysis ending `today`.
pub fn window_range(
    years: u32,
    window_months: u32,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let fetch_days = ((f64::from(years) + f64::from(window_months) / 12.0) * 365.0) as u64;
    let display_days = u64::from(years) * 365;
    let out_of_range = || {
        AnalysisError::invalid_input(
            Reason::InvalidArgument,
            format!("{years} years before {today} is out of range"),
        )
    };
    let fetch_from = today
        .checked_sub_days(Days::new(fetch_days))
        .ok_or_else(out_of_range)?;
    let display_from = today
        .checked_sub_days(Days::new(display_days))
        .ok_or_else(out_of_range)?;
    Ok((fetch_from, display_from))
}

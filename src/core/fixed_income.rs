//! Synthetic valuation series for fixed-income reference rates.

use crate::core::error::{AnalysisError, Reason, Result};
use crate::core::instrument::FixedIncomeKind;
use crate::core::rates::{RateSeries, RateSeriesProvider};
use crate::core::series::{Quote, TimeSeries, within};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Notional principal the synthetic series compounds from.
pub const NOTIONAL: f64 = 100_000.0;
/// Business days per year used to de-annualize overnight rates.
pub const BUSINESS_DAYS_PER_YEAR: f64 = 252.0;
/// Policy rate above which savings accrue a fixed monthly rate.
pub const SAVINGS_POLICY_THRESHOLD: f64 = 8.5;
/// Fixed monthly accrual, in percent, above the threshold.
pub const SAVINGS_FIXED_MONTHLY: f64 = 0.5;
/// Share of the policy rate accrued at or below the threshold.
pub const SAVINGS_POLICY_SHARE: f64 = 0.7;

/// Figures describing a synthesized series over its period.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedIncomeStats {
    /// Mean of the driving annualized rate, in percent.
    pub mean_rate: f64,
    /// Accumulated return over the period, in percent.
    pub accumulated_return: f64,
    pub observations: usize,
    pub final_value: f64,
}

pub struct FixedIncomeProvider<'a> {
    rates: &'a dyn RateSeriesProvider,
}

impl<'a> FixedIncomeProvider<'a> {
    pub fn new(rates: &'a dyn RateSeriesProvider) -> Self {
        Self { rates }
    }

    /// Daily value of [`NOTIONAL`] invested at the reference rate of `kind`.
    #[instrument(name = "FixedIncomeResolve", skip(self))]
    pub async fn resolve(
        &self,
        kind: FixedIncomeKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries> {
        let (series, stats) = match kind {
            FixedIncomeKind::OvernightRate => self.overnight(start, end).await?,
            FixedIncomeKind::Savings => self.savings(start, end).await?,
        };
        info!(
            "{kind}: mean rate {:.2}% p.a., accumulated {:.2}% over {} observations, final value {:.2}",
            stats.mean_rate, stats.accumulated_return, stats.observations, stats.final_value
        );
        Ok(series)
    }

    async fn overnight(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(TimeSeries, FixedIncomeStats)> {
        let observations = self
            .rates
            .fetch_rate_series(RateSeries::Cdi, start, end)
            .await?;
        let in_range = within(&observations, start, end);
        if in_range.is_empty() {
            return Err(AnalysisError::computation(
                Reason::NoDataInRange,
                format!("no {} observation between {start} and {end}", RateSeries::Cdi),
            ));
        }

        let daily: Vec<(NaiveDate, f64)> = in_range
            .iter()
            .map(|o| (o.date, overnight_daily_rate(o.value)))
            .collect();
        let mean_rate = mean(in_range.iter().map(|o| o.value));
        Ok(compound(&daily, mean_rate))
    }

    async fn savings(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(TimeSeries, FixedIncomeStats)> {
        let policy = self
            .rates
            .fetch_rate_series(RateSeries::Selic, start, end)
            .await
            .map_err(|e| {
                AnalysisError::computation(
                    Reason::MissingReferenceRate,
                    format!("savings needs {} data: {e}", RateSeries::Selic),
                )
            })?;
        if policy.is_empty() {
            return Err(AnalysisError::computation(
                Reason::MissingReferenceRate,
                format!("{} series is empty", RateSeries::Selic),
            ));
        }

        let secondary: HashMap<NaiveDate, f64> = match self
            .rates
            .fetch_rate_series(RateSeries::Tr, start, end)
            .await
        {
            Ok(observations) => observations.into_iter().map(|o| (o.date, o.value)).collect(),
            Err(e) => {
                warn!("{} unavailable, assuming 0%: {e}", RateSeries::Tr);
                HashMap::new()
            }
        };

        let in_range = within(&policy, start, end);
        if in_range.is_empty() {
            return Err(AnalysisError::computation(
                Reason::NoDataInRange,
                format!("no {} observation between {start} and {end}", RateSeries::Selic),
            ));
        }

        let daily: Vec<(NaiveDate, f64)> = in_range
            .iter()
            .map(|o| {
                let tr = secondary.get(&o.date).copied().unwrap_or(0.0);
                (o.date, savings_daily_rate(o.value, tr))
            })
            .collect();
        let mean_rate = mean(in_range.iter().map(|o| o.value));
        Ok(compound(&daily, mean_rate))
    }
}

/// Effective daily rate, as a fraction, of an annualized percentage.
pub fn overnight_daily_rate(annual_percent: f64) -> f64 {
    (1.0 + annual_percent / 100.0).powf(1.0 / BUSINESS_DAYS_PER_YEAR) - 1.0
}

/// Monthly savings accrual, in percent, for a policy rate.
pub fn savings_monthly_accrual(policy_percent: f64) -> f64 {
    if policy_percent > SAVINGS_POLICY_THRESHOLD {
        SAVINGS_FIXED_MONTHLY
    } else {
        policy_percent * SAVINGS_POLICY_SHARE / 12.0
    }
}

/// Daily savings rate, as a fraction, approximating a month as 30 days.
pub fn savings_daily_rate(policy_percent: f64, secondary_percent: f64) -> f64 {
    let monthly = savings_monthly_accrual(policy_percent) + secondary_percent / 12.0;
    monthly / 30.0 / 100.0
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Compounds [`NOTIONAL`] forward through the daily rates, first day included.
fn compound(daily: &[(NaiveDate, f64)], mean_rate: f64) -> (TimeSeries, FixedIncomeStats) {
    let mut factor = 1.0;
    let quotes: Vec<Quote> = daily
        .iter()
        .map(|(date, rate)| {
            factor *= 1.0 + rate;
            Quote::uniform(*date, NOTIONAL * factor)
        })
        .collect();

    let stats = FixedIncomeStats {
        mean_rate,
        accumulated_return: (factor - 1.0) * 100.0,
        observations: quotes.len(),
        final_value: NOTIONAL * factor,
    };
    (TimeSeries::from_quotes(quotes), stats)
}

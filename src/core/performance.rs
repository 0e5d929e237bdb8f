//! Comparative performance calculations over daily series.
//!
//! Everything here is pure: series in, derived series or intervals out.
use crate::core::error::{AnalysisError, Reason, Result};
use crate::core::series::{Point, PointSeries, RollingReturnSeries, TimeSeries, VariationSeries};
use anyhow::anyhow;
use chrono::NaiveDate;
use rust_decimal::{Decimal, prelude::*};
use rust_finprim::rate::cagr;
use std::collections::BTreeMap;
use tracing::debug;

/// Approximate number of trading days in a calendar month.
pub const TRADING_DAYS_PER_MONTH: usize = 21;

/// A maximal run of aligned dates where the second series beats the first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuperationInterval {
    pub start: NaiveDate,
    /// Last aligned date inside the run.
    pub end: NaiveDate,
    /// First series' value at `end`.
    pub value_a: f64,
    /// Second series' value at `end`.
    pub value_b: f64,
}

impl SuperationInterval {
    /// Calendar days covered, both ends included.
    pub fn calendar_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Duration in 30-day months, measured between the boundary dates.
    pub fn months(&self) -> f64 {
        (self.end - self.start).num_days() as f64 / 30.0
    }

    /// How far the second series led at the end of the run, in percentage points.
    pub fn spread(&self) -> f64 {
        self.value_b - self.value_a
    }
}

/// Percent deviation of every close from the first close.
pub fn percent_variation(series: &TimeSeries) -> Result<VariationSeries> {
    let base = series
        .quotes()
        .first()
        .map(|q| q.close)
        .ok_or_else(|| AnalysisError::invalid_input(Reason::EmptySeries, "series has no close"))?;
    if base == 0.0 || !base.is_finite() {
        return Err(AnalysisError::invalid_input(
            Reason::InvalidBase,
            format!("base close {base} cannot anchor a variation"),
        ));
    }

    let points = series
        .quotes()
        .iter()
        .map(|q| Point {
            date: q.date,
            value: (q.close - base) / base * 100.0,
        })
        .collect();
    Ok(PointSeries::from_sorted(points))
}

/// Percent return over windows of `window_months * 21` trading days.
///
/// Each value is keyed by the date closing its window, so the result is
/// shorter than `series` by exactly the window width, or empty when the
/// series does not span one window.
pub fn rolling_return(series: &TimeSeries, window_months: u32) -> RollingReturnSeries {
    let width = window_months as usize * TRADING_DAYS_PER_MONTH;
    let quotes = series.quotes();
    if quotes.len() <= width {
        debug!(
            "Series of {} rows is too short for a {width}-day window",
            quotes.len()
        );
        return PointSeries::default();
    }

    let points = quotes
        .iter()
        .zip(&quotes[width..])
        .map(|(begin, end)| Point {
            date: end.date,
            value: (end.close - begin.close) / begin.close * 100.0,
        })
        .collect();
    PointSeries::from_sorted(points)
}

/// Dates present in both series with their two values, in date order.
pub fn align(a: &PointSeries, b: &PointSeries) -> Vec<(NaiveDate, f64, f64)> {
    let by_date: BTreeMap<NaiveDate, f64> = b.points().iter().map(|p| (p.date, p.value)).collect();
    a.points()
        .iter()
        .filter_map(|p| by_date.get(&p.date).map(|vb| (p.date, p.value, *vb)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScanState {
    NotSuperating,
    Superating {
        start: NaiveDate,
        last: (NaiveDate, f64, f64),
    },
}

/// Maximal runs of shared dates where `b` is strictly greater than `a`.
///
/// Works for variation series and rolling-return series alike. A run
/// reports the values at its own last point rather than at the sample that
/// ended it; a run still open at the final shared date closes there.
pub fn detect_superation_intervals(a: &PointSeries, b: &PointSeries) -> Vec<SuperationInterval> {
    let close = |start: NaiveDate, (end, value_a, value_b): (NaiveDate, f64, f64)| {
        SuperationInterval {
            start,
            end,
            value_a,
            value_b,
        }
    };

    let (mut intervals, state) = align(a, b).into_iter().fold(
        (Vec::new(), ScanState::NotSuperating),
        |(mut intervals, state), sample| {
            let (date, va, vb) = sample;
            let next = match (state, vb > va) {
                (ScanState::NotSuperating, true) => ScanState::Superating {
                    start: date,
                    last: sample,
                },
                (ScanState::NotSuperating, false) => ScanState::NotSuperating,
                (ScanState::Superating { start, .. }, true) => ScanState::Superating {
                    start,
                    last: sample,
                },
                (ScanState::Superating { start, last }, false) => {
                    intervals.push(close(start, last));
                    ScanState::NotSuperating
                }
            };
            (intervals, next)
        },
    );

    if let ScanState::Superating { start, last } = state {
        intervals.push(close(start, last));
    }
    intervals
}

/// Headline numbers of a point-to-point comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub final_variation_a: f64,
    pub final_variation_b: f64,
    pub annualized_a: Option<f64>,
    pub annualized_b: Option<f64>,
    pub superation_count: usize,
    pub superation_days: i64,
    /// `true` when the second instrument ends ahead or level.
    pub second_wins: bool,
    /// Absolute gap between the final variations, in percentage points.
    pub difference: f64,
}

pub fn summarize_period(
    series_a: &TimeSeries,
    series_b: &TimeSeries,
    variation_a: &VariationSeries,
    variation_b: &VariationSeries,
    intervals: &[SuperationInterval],
) -> PeriodSummary {
    let final_a = variation_a.last().map_or(0.0, |p| p.value);
    let final_b = variation_b.last().map_or(0.0, |p| p.value);

    PeriodSummary {
        final_variation_a: final_a,
        final_variation_b: final_b,
        annualized_a: annualized_return(series_a).ok(),
        annualized_b: annualized_return(series_b).ok(),
        superation_count: intervals.len(),
        superation_days: intervals.iter().map(SuperationInterval::calendar_days).sum(),
        second_wins: final_a <= final_b,
        difference: (final_a - final_b).abs(),
    }
}

/// Compound annual growth between the first and last close, in percent.
pub fn annualized_return(series: &TimeSeries) -> anyhow::Result<f64> {
    let (first, last) = match (series.quotes().first(), series.quotes().last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(anyhow!("Empty series")),
    };
    let duration_years = (last.date - first.date).num_days() as f64 / 365.0;
    if duration_years <= 0.0 || first.close <= 0.0 || last.close <= 0.0 {
        return Err(anyhow!("Series does not span a positive period"));
    }

    let begin_bal = Decimal::from_f64(first.close).ok_or_else(|| anyhow!("Invalid first close"))?;
    let end_bal = Decimal::from_f64(last.close).ok_or_else(|| anyhow!("Invalid last close"))?;
    let n_years = Decimal::from_f64(duration_years).ok_or_else(|| anyhow!("Invalid duration"))?;
    if n_years.is_zero() {
        return Err(anyhow!("Series does not span a positive period"));
    }

    let rate = cagr(begin_bal, end_bal, n_years);
    let percentage = (rate * Decimal::from(100))
        .to_f64()
        .ok_or_else(|| anyhow!("CAGR percentage conversion failed"))?;
    debug!("cagr: {begin_bal}, {end_bal}, {n_years} = {rate}, {percentage}");
    Ok(percentage)
}

/// Headline numbers of a rolling-window comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSummary {
    pub aligned_windows: usize,
    pub mean_return_a: Option<f64>,
    pub mean_return_b: Option<f64>,
    pub superation_count: usize,
    pub total_months: f64,
    pub mean_months: Option<f64>,
    pub mean_spread: Option<f64>,
}

pub fn summarize_windows(
    returns_a: &RollingReturnSeries,
    returns_b: &RollingReturnSeries,
    intervals: &[SuperationInterval],
) -> WindowSummary {
    let aligned = align(returns_a, returns_b);
    let mean = |values: Vec<f64>| {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };
    let total_months: f64 = intervals.iter().map(SuperationInterval::months).sum();

    WindowSummary {
        aligned_windows: aligned.len(),
        mean_return_a: mean(aligned.iter().map(|(_, a, _)| *a).collect()),
        mean_return_b: mean(aligned.iter().map(|(_, _, b)| *b).collect()),
        superation_count: intervals.len(),
        total_months,
        mean_months: (!intervals.is_empty()).then(|| total_months / intervals.len() as f64),
        mean_spread: mean(intervals.iter().map(SuperationInterval::spread).collect()),
    }
}

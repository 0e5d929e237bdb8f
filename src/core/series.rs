//! Daily series types shared by providers and engines.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One daily row of a price feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

impl Quote {
    /// A row whose price fields all carry the same value, used for synthetic series.
    pub fn uniform(date: NaiveDate, value: f64) -> Self {
        Quote {
            date,
            open: value,
            high: value,
            low: value,
            close: value,
            adj_close: value,
            volume: 0,
        }
    }

    /// Multiplies every price-bearing field, leaving volume untouched.
    pub fn scaled(&self, factor: f64) -> Self {
        Quote {
            date: self.date,
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
            adj_close: self.adj_close * factor,
            volume: self.volume,
        }
    }
}

/// Quotes ordered by strictly increasing date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    quotes: Vec<Quote>,
}

impl TimeSeries {
    /// Builds a series from unordered rows; a repeated date keeps the last row.
    pub fn from_quotes(quotes: impl IntoIterator<Item = Quote>) -> Self {
        let by_date: BTreeMap<NaiveDate, Quote> = quotes.into_iter().map(|q| (q.date, q)).collect();
        TimeSeries {
            quotes: by_date.into_values().collect(),
        }
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.quotes.first().map(|q| q.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.quotes.last().map(|q| q.date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.quotes.iter().map(|q| q.date)
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.quotes.iter().map(|q| q.close)
    }

    /// Applies `f` to every row, keeping the calendar intact.
    pub fn map_quotes(&self, f: impl FnMut(&Quote) -> Quote) -> Self {
        TimeSeries {
            quotes: self.quotes.iter().map(f).collect(),
        }
    }
}

/// A single derived value on a date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub date: NaiveDate,
    pub value: f64,
}

/// Derived values ordered by date: variations and rolling returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSeries {
    points: Vec<Point>,
}

/// Percent deviation of each close from the first close.
pub type VariationSeries = PointSeries;

/// Percent return over a fixed trading-day window, keyed by window-end date.
pub type RollingReturnSeries = PointSeries;

impl PointSeries {
    /// Wraps points that are already sorted by strictly increasing date.
    pub(crate) fn from_sorted(points: Vec<Point>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        PointSeries { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    /// Keeps the points dated on or after `from`.
    pub fn since(&self, from: NaiveDate) -> Self {
        PointSeries {
            points: self
                .points
                .iter()
                .filter(|p| p.date >= from)
                .copied()
                .collect(),
        }
    }

    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.points.iter().map(|p| p.value).sum::<f64>() / self.points.len() as f64)
    }
}

/// An annualized rate, in percent, published for a date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateObservation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Observations dated inside `[start, end]`.
pub fn within(observations: &[RateObservation], start: NaiveDate, end: NaiveDate) -> Vec<RateObservation> {
    observations
        .iter()
        .filter(|o| o.date >= start && o.date <= end)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_within_is_inclusive() {
        let rows: Vec<RateObservation> = (1..=5)
            .map(|day| RateObservation {
                date: d(day),
                value: day as f64,
            })
            .collect();

        let picked = within(&rows, d(2), d(4));
        assert_eq!(picked.iter().map(|o| o.date).collect::<Vec<_>>(), vec![d(2), d(3), d(4)]);
        assert!(within(&rows, d(6), d(9)).is_empty());
    }

    #[test]
    fn test_from_quotes_sorts_and_keeps_last_duplicate() {
        let series = TimeSeries::from_quotes(vec![
            Quote::uniform(d(3), 3.0),
            Quote::uniform(d(1), 1.0),
            Quote::uniform(d(3), 30.0),
        ]);

        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), Some(d(1)));
        assert_eq!(series.quotes()[1].close, 30.0);
    }

    #[test]
    fn test_scaled_keeps_volume() {
        let q = Quote {
            date: d(1),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            adj_close: 1.4,
            volume: 42,
        };
        let s = q.scaled(2.0);
        assert_eq!(s.open, 2.0);
        assert_eq!(s.high, 4.0);
        assert_eq!(s.low, 1.0);
        assert_eq!(s.close, 3.0);
        assert_eq!(s.adj_close, 2.8);
        assert_eq!(s.volume, 42);
    }

    #[test]
    fn test_point_series_since_and_mean() {
        let series = PointSeries::from_sorted(vec![
            Point { date: d(1), value: 1.0 },
            Point { date: d(2), value: 2.0 },
            Point { date: d(3), value: 6.0 },
        ]);
        let tail = series.since(d(2));
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.mean(), Some(4.0));
        assert_eq!(PointSeries::default().mean(), None);
    }
}

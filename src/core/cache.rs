//! Persistence port for reference-rate series.

use crate::core::series::RateObservation;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// A cached series and the instant it was last refreshed.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub observations: Vec<RateObservation>,
    /// `None` when the series file exists but the refresh index lost track of it.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Whether the entry was refreshed less than `max_age` before `now`.
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.refreshed_at
            .map(|at| now - at < max_age)
            .unwrap_or(false)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }
}

/// Storage of named rate series.
///
/// Entries are superseded by `store`, never deleted.
#[async_trait]
pub trait SeriesCache: Send + Sync {
    /// Reads the entry for `name`, `None` when absent.
    async fn load(&self, name: &str) -> Result<Option<CacheEntry>>;

    /// Replaces the series for `name` and stamps it with `refreshed_at`.
    async fn store(
        &self,
        name: &str,
        observations: &[RateObservation],
        refreshed_at: DateTime<Utc>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_window() {
        let now = Utc::now();
        let entry = CacheEntry {
            observations: vec![],
            refreshed_at: Some(now - Duration::days(6)),
        };
        assert!(entry.is_fresh(Duration::days(7), now));
        assert!(!entry.is_fresh(Duration::days(5), now));

        let untracked = CacheEntry {
            observations: vec![],
            refreshed_at: None,
        };
        assert!(!untracked.is_fresh(Duration::days(7), now));
    }
}

use crate::core::cache::{CacheEntry, SeriesCache};
use crate::core::series::RateObservation;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Process-local series cache, lost on exit.
#[derive(Clone, Default)]
pub struct MemorySeriesCache {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl MemorySeriesCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeriesCache for MemorySeriesCache {
    async fn load(&self, name: &str) -> Result<Option<CacheEntry>> {
        let cache = self.inner.lock().await;
        let entry = cache.get(name).cloned();
        debug!(
            "Cache {} for series: {}",
            if entry.is_some() { "HIT" } else { "MISS" },
            name
        );
        Ok(entry)
    }

    async fn store(
        &self,
        name: &str,
        observations: &[RateObservation],
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for series: {} ({} rows)", name, observations.len());
        cache.insert(
            name.to_string(),
            CacheEntry {
                observations: observations.to_vec(),
                refreshed_at: Some(refreshed_at),
            },
        );
        Ok(())
    }
}

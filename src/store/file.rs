use crate::core::cache::{CacheEntry, SeriesCache};
use crate::core::series::RateObservation;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const INDEX_FILE: &str = "last_refresh.json";

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    value: f64,
}

type RefreshIndex = BTreeMap<String, DateTime<Utc>>;

/// Series cache kept as one CSV file per series plus a JSON index of
/// refresh timestamps.
///
/// Writes go through a temporary file and a rename, so a failed write
/// leaves the previous contents in place. The index is not locked; two
/// processes storing at once may lose one timestamp.
pub struct FileSeriesCache {
    dir: PathBuf,
}

impl FileSeriesCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn series_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn read_index(&self) -> RefreshIndex {
        let path = self.index_path();
        let Ok(content) = fs::read_to_string(&path) else {
            return RefreshIndex::new();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring corrupt refresh index {}: {e}", path.display());
            RefreshIndex::new()
        })
    }

    fn read_series(&self, path: &Path) -> Result<Vec<RateObservation>> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open cache file: {}", path.display()))?;
        let mut observations = reader
            .deserialize::<CsvRow>()
            .map(|row| {
                row.map(|r| RateObservation {
                    date: r.date,
                    value: r.value,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to parse cache file: {}", path.display()))?;
        observations.sort_by_key(|o| o.date);
        Ok(observations)
    }

    fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .with_context(|| format!("Failed to write temporary file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace cache file: {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl SeriesCache for FileSeriesCache {
    async fn load(&self, name: &str) -> Result<Option<CacheEntry>> {
        let path = self.series_path(name);
        if !path.exists() {
            debug!("Cache MISS for series: {}", name);
            return Ok(None);
        }

        let observations = self.read_series(&path)?;
        let refreshed_at = self.read_index().get(name).copied();
        debug!(
            "Cache HIT for series: {} ({} rows, refreshed {:?})",
            name,
            observations.len(),
            refreshed_at
        );
        Ok(Some(CacheEntry {
            observations,
            refreshed_at,
        }))
    }

    async fn store(
        &self,
        name: &str,
        observations: &[RateObservation],
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache dir: {}", self.dir.display()))?;

        let path = self.series_path(name);
        let tmp = path.with_extension("tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)
                .with_context(|| format!("Failed to create cache file: {}", tmp.display()))?;
            for o in observations {
                writer.serialize(CsvRow {
                    date: o.date,
                    value: o.value,
                })?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace cache file: {}", path.display()))?;

        let mut index = self.read_index();
        index.insert(name.to_string(), refreshed_at);
        Self::write_atomically(&self.index_path(), &serde_json::to_vec_pretty(&index)?)?;

        debug!("Cache PUT for series: {} ({} rows)", name, observations.len());
        Ok(())
    }
}

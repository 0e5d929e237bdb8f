use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: "https://query1.finance.yahoo.com".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BcbProviderConfig {
    pub base_url: String,
    /// Retry a failed secure connection once without certificate verification.
    pub insecure_fallback: bool,
}

impl Default for BcbProviderConfig {
    fn default() -> Self {
        BcbProviderConfig {
            base_url: "https://api.bcb.gov.br".to_string(),
            insecure_fallback: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub yahoo: YahooProviderConfig,
    pub bcb: BcbProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CurrencyConfig {
    /// Currency whose quotes get converted.
    pub source: String,
    /// Currency every comparison is expressed in.
    pub target: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            source: "USD".to_string(),
            target: "BRL".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub attempts: usize,
    pub timeout_secs: u64,
    pub backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            attempts: 3,
            timeout_secs: 30,
            backoff_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory of the rate-series cache; the platform data dir when unset.
    pub path: Option<String>,
    pub freshness_days: i64,
    pub segment_years: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            path: None,
            freshness_days: 7,
            segment_years: 5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub currency: CurrencyConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Loads the default config file, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "assetcmp", "assetcmp")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.cache.path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().join("rates"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        // An empty document deserializes to unit, not to a map.
        if config_str.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  yahoo:
    base_url: "http://localhost:1234"
  bcb:
    insecure_fallback: false
currency:
  source: EUR
fetch:
  attempts: 5
cache:
  path: /tmp/rates
  freshness_days: 1
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.providers.yahoo.base_url, "http://localhost:1234");
        assert_eq!(config.providers.bcb.base_url, "https://api.bcb.gov.br");
        assert!(!config.providers.bcb.insecure_fallback);
        assert_eq!(config.currency.source, "EUR");
        assert_eq!(config.currency.target, "BRL");
        assert_eq!(config.fetch.attempts, 5);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.fetch.backoff_ms, 2000);
        assert_eq!(config.cache.freshness_days, 1);
        assert_eq!(config.cache.segment_years, 5);
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/rates"));
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.providers.yahoo.base_url, "https://query1.finance.yahoo.com");
        assert!(config.providers.bcb.insecure_fallback);
        assert_eq!(config.fetch.attempts, 3);
        assert_eq!(config.cache.freshness_days, 7);
        assert!(config.cache.path.is_none());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "currency:\n  target: USD").unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.currency.target, "USD");
        assert_eq!(config.currency.source, "USD");
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let file = NamedTempFile::new().unwrap();
        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = AppConfig::load_from_path("/nonexistent/assetcmp.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}

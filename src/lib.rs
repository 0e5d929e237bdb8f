pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::compare::ComparisonOrchestrator;
use crate::core::config::AppConfig;
use crate::providers::bcb::BcbProvider;
use crate::providers::fetcher::SeriesFetcher;
use crate::providers::rate_series::RateSeriesFetcher;
use crate::providers::yahoo_finance::YahooFinanceProvider;
use crate::store::FileSeriesCache;
use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Percent variation of two instruments between two dates.
    Compare {
        first: String,
        second: String,
        start: NaiveDate,
        /// Today when unset.
        end: Option<NaiveDate>,
    },
    /// Rolling returns of two instruments over the last `years`.
    Windows {
        first: String,
        second: String,
        years: u32,
        months: u32,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("assetcmp starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    run_with_config(command, &config, Local::now().date_naive()).await
}

/// Wires providers from `config` and runs `command` as of `today`.
pub async fn run_with_config(command: AppCommand, config: &AppConfig, today: NaiveDate) -> Result<()> {
    let timeout = Duration::from_secs(config.fetch.timeout_secs);

    let yahoo = YahooFinanceProvider::new(&config.providers.yahoo.base_url, timeout)?;
    let market = SeriesFetcher::new(Arc::new(yahoo), config.fetch.attempts, config.fetch.backoff_ms);

    let bcb = BcbProvider::new(
        &config.providers.bcb.base_url,
        timeout,
        config.providers.bcb.insecure_fallback,
    )?;
    let cache_dir = config.cache_dir()?;
    debug!("Rate cache at {}", cache_dir.display());
    let rates = RateSeriesFetcher::new(
        Arc::new(bcb),
        Arc::new(FileSeriesCache::new(cache_dir)),
        config.cache.segment_years,
        config.cache.freshness_days,
    );

    let orchestrator = ComparisonOrchestrator::new(
        &market,
        &rates,
        &config.currency.source,
        &config.currency.target,
    );

    match command {
        AppCommand::Compare {
            first,
            second,
            start,
            end,
        } => {
            let end = end.unwrap_or(today);
            cli::compare::run(&orchestrator, &first, &second, start, end).await
        }
        AppCommand::Windows {
            first,
            second,
            years,
            months,
        } => cli::windows::run(&orchestrator, &first, &second, years, months, today).await,
    }
}

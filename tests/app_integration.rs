use assetcmp::core::config::AppConfig;
use assetcmp::core::error::{AnalysisError, Reason};
use assetcmp::{AppCommand, run_command, run_with_config};
use chrono::NaiveDate;
use std::fs;
use tracing::{error, info};

mod test_utils {
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Chart body with one row per `(date, close)`, traded at 14:30 UTC.
    pub fn chart_body(rows: &[(NaiveDate, f64)]) -> String {
        let timestamps: Vec<String> = rows
            .iter()
            .map(|(d, _)| (d.and_hms_opt(14, 30, 0).unwrap().and_utc().timestamp()).to_string())
            .collect();
        let closes: Vec<String> = rows.iter().map(|(_, c)| c.to_string()).collect();
        format!(
            r#"{{"chart":{{"result":[{{"meta":{{"regularMarketPrice":{last},"gmtoffset":0}},
            "timestamp":[{ts}],"indicators":{{"quote":[{{"close":[{cl}]}}]}}}}],"error":null}}}}"#,
            last = closes.last().cloned().unwrap_or_else(|| "0".to_string()),
            ts = timestamps.join(","),
            cl = closes.join(",")
        )
    }

    pub async fn mount_chart(server: &MockServer, symbol: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{symbol}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub fn write_config(dir: &std::path::Path, yahoo: &str, bcb: &str) -> std::path::PathBuf {
        let config_path = dir.join("config.yaml");
        let config_content = format!(
            r#"
providers:
  yahoo:
    base_url: {yahoo}
  bcb:
    base_url: {bcb}
    insecure_fallback: false
fetch:
  attempts: 2
  timeout_secs: 5
  backoff_ms: 0
cache:
  path: {}
"#,
            dir.join("rates").display()
        );
        std::fs::write(&config_path, config_content).expect("Failed to write config file");
        config_path
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_compare_two_market_instruments() {
    use test_utils::*;

    let server = wiremock::MockServer::start().await;
    let days = [date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4), date(2024, 1, 5)];
    let a: Vec<_> = days.iter().copied().zip([100.0, 110.0, 90.0, 80.0]).collect();
    let b: Vec<_> = days.iter().copied().zip([100.0, 105.0, 95.0, 130.0]).collect();
    mount_chart(&server, "AAPL", chart_body(&a)).await;
    mount_chart(&server, "MSFT", chart_body(&b)).await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), &server.uri(), "http://127.0.0.1:9");

    let result = run_command(
        AppCommand::Compare {
            first: "aapl".to_string(),
            second: "MSFT".to_string(),
            start: date(2024, 1, 1),
            end: Some(date(2024, 1, 5)),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Compare failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_fixed_income_uses_rate_cache() {
    use test_utils::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    let yahoo = wiremock::MockServer::start().await;
    let days = [date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4), date(2024, 1, 5)];
    let rows: Vec<_> = days.iter().copied().zip([10.0, 10.5, 10.2, 10.1]).collect();
    mount_chart(&yahoo, "PETR4.SA", chart_body(&rows)).await;

    let bcb = wiremock::MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dados/serie/bcdata.sgs.12/dados"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"data":"02/01/2024","valor":"11.65"},{"data":"03/01/2024","valor":"11.65"},
                {"data":"04/01/2024","valor":"11.65"},{"data":"05/01/2024","valor":"11.65"}]"#,
        ))
        .expect(1)
        .mount(&bcb)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), &yahoo.uri(), &bcb.uri());
    let command = AppCommand::Compare {
        first: "PETR4.SA".to_string(),
        second: "RF-CDI".to_string(),
        start: date(2024, 1, 2),
        end: Some(date(2024, 1, 5)),
    };

    for run in 0..2 {
        info!(run, "Running fixed-income comparison");
        let result = run_command(command.clone(), Some(config_path.to_str().unwrap())).await;
        assert!(result.is_ok(), "Run {run} failed with: {:?}", result.err());
    }

    assert!(dir.path().join("rates/cdi.csv").exists());
    let index = fs::read_to_string(dir.path().join("rates/last_refresh.json")).unwrap();
    assert!(index.contains("\"cdi\""));
}

#[test_log::test(tokio::test)]
async fn test_source_currency_instrument_is_converted() {
    use test_utils::*;

    let server = wiremock::MockServer::start().await;
    let days = [date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)];
    mount_chart(
        &server,
        "BTC-USD",
        chart_body(&days.iter().copied().zip([42000.0, 43000.0, 44000.0]).collect::<Vec<_>>()),
    )
    .await;
    mount_chart(
        &server,
        "USDBRL=X",
        chart_body(&days.iter().copied().zip([4.9, 4.95, 5.0]).collect::<Vec<_>>()),
    )
    .await;
    mount_chart(
        &server,
        "^BVSP",
        chart_body(&days.iter().copied().zip([132000.0, 131000.0, 130000.0]).collect::<Vec<_>>()),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), &server.uri(), "http://127.0.0.1:9");

    let result = run_command(
        AppCommand::Compare {
            first: "BTC-USD".to_string(),
            second: "IBOV".to_string(),
            start: date(2024, 1, 2),
            end: Some(date(2024, 1, 4)),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Compare failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_unknown_ticker_reports_not_found() {
    let server = wiremock::MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = test_utils::write_config(dir.path(), &server.uri(), "http://127.0.0.1:9");

    let result = run_command(
        AppCommand::Compare {
            first: "NOPE".to_string(),
            second: "AAPL".to_string(),
            start: date(2024, 1, 1),
            end: Some(date(2024, 1, 5)),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;

    let err = result.expect_err("unknown ticker should fail");
    let analysis = err
        .downcast_ref::<AnalysisError>()
        .expect("error should be an AnalysisError");
    assert!(matches!(analysis, AnalysisError::NotFound { .. }));
    assert_eq!(analysis.reason(), Reason::UnknownIdentifier);
}

#[test_log::test(tokio::test)]
async fn test_rolling_windows_end_to_end() {
    use test_utils::*;

    let today = date(2024, 6, 28);
    let days: Vec<NaiveDate> = date(2023, 5, 1)
        .iter_days()
        .take_while(|d| *d <= today)
        .collect();
    let a: Vec<_> = days.iter().enumerate().map(|(i, d)| (*d, 100.0 + i as f64)).collect();
    let b: Vec<_> = days
        .iter()
        .enumerate()
        .map(|(i, d)| (*d, 100.0 + 2.0 * i as f64))
        .collect();

    let server = wiremock::MockServer::start().await;
    mount_chart(&server, "SLOW", chart_body(&a)).await;
    mount_chart(&server, "FAST", chart_body(&b)).await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), &server.uri(), "http://127.0.0.1:9");
    let config = AppConfig::load_from_path(&config_path).unwrap();

    let result = run_with_config(
        AppCommand::Windows {
            first: "SLOW".to_string(),
            second: "FAST".to_string(),
            years: 1,
            months: 1,
        },
        &config,
        today,
    )
    .await;
    assert!(result.is_ok(), "Windows failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_invalid_window_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.cache.path = Some(dir.path().display().to_string());
    let result = run_with_config(
        AppCommand::Windows {
            first: "AAPL".to_string(),
            second: "MSFT".to_string(),
            years: 1,
            months: 13,
        },
        &config,
        date(2024, 6, 28),
    )
    .await;

    let err = result.expect_err("window longer than the period should fail");
    let analysis = err.downcast_ref::<AnalysisError>().unwrap();
    assert_eq!(analysis.reason(), Reason::InvalidArgument);
}

#[test_log::test(tokio::test)]
#[ignore = "requires network access"]
async fn test_real_yahoo_finance_api() {
    use assetcmp::core::price::MarketFeed;
    use assetcmp::providers::yahoo_finance::YahooFinanceProvider;

    let base_url = "https://query1.finance.yahoo.com";
    let provider = YahooFinanceProvider::new(base_url, std::time::Duration::from_secs(30)).unwrap();

    let symbol = "AAPL";
    info!(?symbol, "Fetching history from Yahoo Finance");

    match provider.history(symbol, date(2024, 1, 1), date(2024, 3, 1)).await {
        Ok(series) => {
            info!(rows = series.len(), "Received successful history response");
            assert!(series.len() > 30, "Two months should hold more than 30 sessions");
            assert!(series.closes().all(|c| c > 0.0), "Closes should be positive");
        }
        Err(e) => {
            error!("API request failed: {e}\n{e:?}");
            panic!("API request failed: {e}");
        }
    }
}

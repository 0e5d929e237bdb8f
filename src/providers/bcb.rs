//! Central Bank of Brazil time-series (SGS) adapter.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::error::{AnalysisError, Reason, Result};
use crate::core::rates::RateSource;
use crate::core::series::RateObservation;
use crate::providers::util::{from_status, from_transport};

const DATE_FORMAT: &str = "%d/%m/%Y";

/// One window query against the SGS JSON endpoint.
///
/// When enabled, a connection failure is retried once with certificate
/// verification disabled.
pub struct BcbProvider {
    base_url: String,
    client: reqwest::Client,
    insecure_client: Option<reqwest::Client>,
}

impl BcbProvider {
    pub fn new(base_url: &str, timeout: Duration, insecure_fallback: bool) -> anyhow::Result<Self> {
        let client = Self::client_builder(timeout).build()?;
        let insecure_client = if insecure_fallback {
            Some(
                Self::client_builder(timeout)
                    .danger_accept_invalid_certs(true)
                    .build()?,
            )
        } else {
            None
        };
        Ok(Self::with_clients(base_url, client, insecure_client))
    }

    /// Uses prepared clients; `insecure_client` is tried once after a
    /// connection failure of `client`.
    pub fn with_clients(
        base_url: &str,
        client: reqwest::Client,
        insecure_client: Option<reqwest::Client>,
    ) -> Self {
        BcbProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            insecure_client,
        }
    }

    fn client_builder(timeout: Duration) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .user_agent("assetcmp/1.0")
            .timeout(timeout)
    }

    async fn send(&self, url: &str, context: &str) -> Result<reqwest::Response> {
        match self.client.get(url).send().await {
            Ok(response) => Ok(response),
            Err(e) if e.is_connect() => match &self.insecure_client {
                Some(insecure) => {
                    warn!("Secure connection failed for {context}, retrying without certificate verification: {e}");
                    insecure
                        .get(url)
                        .send()
                        .await
                        .map_err(|e| from_transport(&e, context))
                }
                None => Err(from_transport(&e, context)),
            },
            Err(e) => Err(from_transport(&e, context)),
        }
    }
}

#[derive(Deserialize, Debug)]
struct SgsRow {
    data: String,
    valor: Value,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum SgsResponse {
    Rows(Vec<SgsRow>),
    Failure(Value),
}

fn parse_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Observations of a decoded body; rows with an unreadable date or value are dropped.
fn to_observations(rows: &[SgsRow]) -> Vec<RateObservation> {
    rows.iter()
        .filter_map(|row| {
            let date = NaiveDate::parse_from_str(row.data.trim(), DATE_FORMAT).ok()?;
            let value = parse_value(&row.valor)?;
            value.is_finite().then_some(RateObservation { date, value })
        })
        .collect()
}

fn failure_message(body: &Value) -> String {
    body.get("error")
        .or_else(|| body.get("message"))
        .map(|v| v.to_string())
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl RateSource for BcbProvider {
    #[instrument(name = "BcbWindowFetch", skip(self))]
    async fn fetch_window(
        &self,
        code: u32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateObservation>> {
        let context = format!(
            "SGS {code} {}..{}",
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        );
        let url = format!(
            "{}/dados/serie/bcdata.sgs.{}/dados?formato=json&dataInicial={}&dataFinal={}",
            self.base_url,
            code,
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        );
        debug!("Requesting rate series from {}", url);

        let response = self.send(&url, &context).await?;
        if !response.status().is_success() {
            return Err(from_status(response.status(), &context));
        }
        let body = response
            .text()
            .await
            .map_err(|e| from_transport(&e, &context))?;

        let rows = match serde_json::from_str::<SgsResponse>(&body) {
            Ok(SgsResponse::Rows(rows)) => rows,
            Ok(SgsResponse::Failure(value)) => {
                return Err(AnalysisError::not_found(
                    Reason::UpstreamStatus,
                    format!("{context}: {}", failure_message(&value)),
                ));
            }
            Err(e) => {
                return Err(AnalysisError::not_found(
                    Reason::MalformedResponse,
                    format!("{context}: {e}"),
                ));
            }
        };

        let observations = to_observations(&rows);
        if observations.is_empty() {
            return Err(AnalysisError::not_found(
                Reason::EmptyResponse,
                format!("{context}: no observations"),
            ));
        }
        debug!("{context}: {} observations", observations.len());
        Ok(observations)
    }
}

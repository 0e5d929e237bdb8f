use crate::core::error::{AnalysisError, Reason, Result};
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retries an async operation while it fails transiently
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `attempts`: Total number of runs, at least one
/// - `delay_ms`: Milliseconds between attempts
///
/// # Returns
/// The successful result, the first non-transient error, or a transient
/// error whose reason is classified from the last failure once all attempts
/// are spent
pub async fn with_retry<F, Fut, T>(mut operation: F, attempts: usize, delay_ms: u64) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => {
                if attempt >= attempts {
                    warn!("All {attempts} attempts failed: {err}");
                    let text = err.detail().unwrap_or_default().to_string();
                    let reason = match Reason::classify(&text) {
                        Reason::Generic => err.reason(),
                        classified => classified,
                    };
                    return Err(AnalysisError::transient(reason, text));
                }
                debug!("Attempt {}/{} failed: {}. Retrying...", attempt, attempts, err);
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// Maps a transport failure onto the error taxonomy.
///
/// Only timeouts and failures while sending are transient. An undecodable
/// body is `NotFound(MalformedResponse)`; builder, redirect and body errors
/// are `NotFound(Generic)` and never retried.
pub fn from_transport(err: &reqwest::Error, context: &str) -> AnalysisError {
    let detail = format!("{context}: {err}");
    if err.is_timeout() || err.is_connect() {
        AnalysisError::transient(Reason::Connectivity, detail)
    } else if err.is_request() {
        AnalysisError::transient(Reason::Generic, detail)
    } else if err.is_decode() {
        AnalysisError::not_found(Reason::MalformedResponse, detail)
    } else {
        AnalysisError::not_found(Reason::Generic, detail)
    }
}

/// Maps a non-success HTTP status onto the error taxonomy.
pub fn from_status(status: StatusCode, context: &str) -> AnalysisError {
    let detail = format!("{context}: HTTP {status}");
    if status == StatusCode::NOT_FOUND {
        AnalysisError::not_found(Reason::UnknownIdentifier, detail)
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        AnalysisError::transient(Reason::Generic, detail)
    } else {
        AnalysisError::not_found(Reason::UpstreamStatus, detail)
    }
}

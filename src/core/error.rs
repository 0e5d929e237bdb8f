//! Typed failures shared by the acquisition layer and the performance engine.

use std::fmt::Display;
use thiserror::Error;

/// Structured reason attached to every [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// The upstream does not know the identifier.
    UnknownIdentifier,
    /// The network or the upstream could not be reached in time.
    Connectivity,
    /// Failure text matched no known pattern.
    Generic,
    /// The upstream answered successfully but without any row.
    EmptyResponse,
    /// The upstream answered with a non-success HTTP status.
    UpstreamStatus,
    /// The upstream body could not be understood.
    MalformedResponse,
    /// A series handed to the engine had no observation.
    EmptySeries,
    /// The base close of a series is zero or not finite.
    InvalidBase,
    /// A reference rate required for a synthetic series is unavailable.
    MissingReferenceRate,
    /// Data exists, but none of it falls inside the requested range.
    NoDataInRange,
    /// Not enough history to fill a single rolling window.
    InsufficientHistory,
    /// A request parameter is out of bounds.
    InvalidArgument,
}

impl Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Reason::UnknownIdentifier => "unknown identifier",
                Reason::Connectivity => "connectivity failure",
                Reason::Generic => "generic failure",
                Reason::EmptyResponse => "empty response",
                Reason::UpstreamStatus => "upstream status",
                Reason::MalformedResponse => "malformed response",
                Reason::EmptySeries => "empty series",
                Reason::InvalidBase => "invalid base value",
                Reason::MissingReferenceRate => "missing reference rate",
                Reason::NoDataInRange => "no data in range",
                Reason::InsufficientHistory => "insufficient history",
                Reason::InvalidArgument => "invalid argument",
            }
        )
    }
}

impl Reason {
    /// Best-effort classification of a failure message.
    ///
    /// Only ever used to pick the reason of an error whose kind was already
    /// decided from typed information; never drives retries.
    pub fn classify(text: &str) -> Reason {
        let lower = text.to_lowercase();
        if text.contains("404") || text.contains("Not Found") || lower.contains("delisted") {
            Reason::UnknownIdentifier
        } else if text.contains("ConnectionError")
            || text.contains("Failed to connect")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("error sending request")
        {
            Reason::Connectivity
        } else {
            Reason::Generic
        }
    }

    /// Human-oriented advice for the reason.
    pub fn hint(&self) -> &'static str {
        match self {
            Reason::UnknownIdentifier => {
                "the ticker may be delisted or renamed; use ^BVSP for Ibovespa and add .SA to Brazilian stocks (e.g. PETR4.SA)"
            }
            Reason::Connectivity => {
                "check the internet connection; the provider may be temporarily unavailable, try again in a few minutes"
            }
            Reason::EmptyResponse | Reason::NoDataInRange => {
                "the asset may have no data for the chosen period"
            }
            Reason::MissingReferenceRate => {
                "the savings series needs SELIC data; try RF-CDI as an alternative"
            }
            Reason::InsufficientHistory => "use a longer period or a smaller window",
            Reason::InvalidArgument => "check the tickers and the requested period",
            Reason::UpstreamStatus | Reason::MalformedResponse | Reason::Generic => {
                "try again later"
            }
            Reason::EmptySeries | Reason::InvalidBase => "the series cannot be compared",
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("not found ({reason}){}", detail_suffix(.detail))]
    NotFound {
        reason: Reason,
        detail: Option<String>,
    },

    #[error("transient error ({reason}){}", detail_suffix(.detail))]
    Transient {
        reason: Reason,
        detail: Option<String>,
    },

    #[error("invalid input ({reason}){}", detail_suffix(.detail))]
    InvalidInput {
        reason: Reason,
        detail: Option<String>,
    },

    #[error("computation error ({reason}){}", detail_suffix(.detail))]
    Computation {
        reason: Reason,
        detail: Option<String>,
    },
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

impl AnalysisError {
    pub fn not_found(reason: Reason, detail: impl Into<String>) -> Self {
        AnalysisError::NotFound {
            reason,
            detail: Some(detail.into()),
        }
    }

    pub fn transient(reason: Reason, detail: impl Into<String>) -> Self {
        AnalysisError::Transient {
            reason,
            detail: Some(detail.into()),
        }
    }

    pub fn invalid_input(reason: Reason, detail: impl Into<String>) -> Self {
        AnalysisError::InvalidInput {
            reason,
            detail: Some(detail.into()),
        }
    }

    pub fn computation(reason: Reason, detail: impl Into<String>) -> Self {
        AnalysisError::Computation {
            reason,
            detail: Some(detail.into()),
        }
    }

    pub fn reason(&self) -> Reason {
        match self {
            AnalysisError::NotFound { reason, .. }
            | AnalysisError::Transient { reason, .. }
            | AnalysisError::InvalidInput { reason, .. }
            | AnalysisError::Computation { reason, .. } => *reason,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            AnalysisError::NotFound { detail, .. }
            | AnalysisError::Transient { detail, .. }
            | AnalysisError::InvalidInput { detail, .. }
            | AnalysisError::Computation { detail, .. } => detail.as_deref(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, AnalysisError::Transient { .. })
    }

    pub fn hint(&self) -> &'static str {
        self.reason().hint()
    }
}

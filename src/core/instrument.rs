//! Instrument identifiers and the capability tag that routes them.

use crate::core::error::{AnalysisError, Reason, Result};
use std::fmt::Display;
use tracing::info;

/// Prefix of the synthetic fixed-income tickers.
pub const FIXED_INCOME_PREFIX: &str = "RF-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedIncomeKind {
    /// Accumulated overnight interbank rate (CDI).
    OvernightRate,
    /// Savings account (poupança) rule over SELIC and TR.
    Savings,
}

impl Display for FixedIncomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FixedIncomeKind::OvernightRate => "RF-CDI",
                FixedIncomeKind::Savings => "RF-POUPANCA",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentKind {
    /// Priced by the external market feed.
    Market,
    /// Synthesized from reference rates.
    FixedIncome(FixedIncomeKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentRef {
    pub symbol: String,
    pub kind: InstrumentKind,
}

/// Common spellings users type instead of the feed's ticker.
const SUGGESTIONS: &[(&str, &str)] = &[
    ("BTC-BRL", "BTC-USD"),
    ("ETH-BRL", "ETH-USD"),
    ("BITCOIN", "BTC-USD"),
    ("ETHEREUM", "ETH-USD"),
    ("IBOV", "^BVSP"),
    ("IBOVESPA", "^BVSP"),
    ("BOVESPA", "^BVSP"),
    ("BVSP", "^BVSP"),
    ("SP500", "^GSPC"),
    ("S&P500", "^GSPC"),
    ("S&P 500", "^GSPC"),
    ("DOW", "^DJI"),
    ("NASDAQ", "^IXIC"),
];

/// Returns the canonical ticker for a known misspelling.
pub fn suggestion_for(ticker: &str) -> Option<&'static str> {
    SUGGESTIONS
        .iter()
        .find(|(wrong, _)| *wrong == ticker)
        .map(|(_, right)| *right)
}

impl InstrumentRef {
    /// Normalizes user input into an instrument, applying known corrections.
    pub fn parse(input: &str) -> Result<Self> {
        let mut symbol = input.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AnalysisError::invalid_input(
                Reason::InvalidArgument,
                "ticker cannot be empty",
            ));
        }

        if let Some(canonical) = suggestion_for(&symbol) {
            info!("Using '{canonical}' instead of '{symbol}'");
            symbol = canonical.to_string();
        }

        let kind = if symbol.starts_with(FIXED_INCOME_PREFIX) {
            match symbol.as_str() {
                "RF-CDI" => InstrumentKind::FixedIncome(FixedIncomeKind::OvernightRate),
                "RF-POUPANCA" => InstrumentKind::FixedIncome(FixedIncomeKind::Savings),
                _ => {
                    return Err(AnalysisError::invalid_input(
                        Reason::InvalidArgument,
                        format!("fixed income ticker '{symbol}' not recognized"),
                    ));
                }
            }
        } else {
            InstrumentKind::Market
        };

        Ok(InstrumentRef { symbol, kind })
    }

    /// Whether the series is quoted in `source_currency` and must be converted.
    pub fn needs_conversion(&self, source_currency: &str) -> bool {
        self.kind == InstrumentKind::Market
            && self.symbol.ends_with(&format!("-{source_currency}"))
    }

    /// Label shown to users; converted series are marked with an asterisk.
    pub fn display_name(&self, source_currency: &str, target_currency: &str) -> String {
        if self.needs_conversion(source_currency) {
            let stem = &self.symbol[..self.symbol.len() - source_currency.len() - 1];
            format!("{stem}-{target_currency}*")
        } else {
            self.symbol.clone()
        }
    }
}

impl Display for InstrumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Rejects a pair that cannot be compared.
pub fn validate_pair(first: &InstrumentRef, second: &InstrumentRef) -> Result<()> {
    if first.symbol == second.symbol {
        return Err(AnalysisError::invalid_input(
            Reason::InvalidArgument,
            format!("tickers must differ, got '{}' twice", first.symbol),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_market_ticker() {
        let i = InstrumentRef::parse("  petr4.sa ").unwrap();
        assert_eq!(i.symbol, "PETR4.SA");
        assert_eq!(i.kind, InstrumentKind::Market);
    }

    #[test]
    fn test_parse_fixed_income() {
        assert_eq!(
            InstrumentRef::parse("rf-cdi").unwrap().kind,
            InstrumentKind::FixedIncome(FixedIncomeKind::OvernightRate)
        );
        assert_eq!(
            InstrumentRef::parse("RF-POUPANCA").unwrap().kind,
            InstrumentKind::FixedIncome(FixedIncomeKind::Savings)
        );
    }

    #[test]
    fn test_parse_unknown_fixed_income_fails() {
        let err = InstrumentRef::parse("RF-LCI").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
        assert_eq!(err.reason(), Reason::InvalidArgument);
    }

    #[test]
    fn test_parse_empty_fails() {
        assert!(InstrumentRef::parse("   ").is_err());
    }

    #[test]
    fn test_parse_applies_suggestions() {
        assert_eq!(InstrumentRef::parse("ibov").unwrap().symbol, "^BVSP");
        assert_eq!(InstrumentRef::parse("btc-brl").unwrap().symbol, "BTC-USD");
        assert_eq!(InstrumentRef::parse("S&P 500").unwrap().symbol, "^GSPC");
    }

    #[test]
    fn test_conversion_and_display_name() {
        let btc = InstrumentRef::parse("BTC-USD").unwrap();
        assert!(btc.needs_conversion("USD"));
        assert_eq!(btc.display_name("USD", "BRL"), "BTC-BRL*");

        let petr = InstrumentRef::parse("PETR4.SA").unwrap();
        assert!(!petr.needs_conversion("USD"));
        assert_eq!(petr.display_name("USD", "BRL"), "PETR4.SA");

        let cdi = InstrumentRef::parse("RF-CDI").unwrap();
        assert!(!cdi.needs_conversion("USD"));
    }

    #[test]
    fn test_validate_pair_rejects_same_ticker() {
        let a = InstrumentRef::parse("AAPL").unwrap();
        let b = InstrumentRef::parse("aapl").unwrap();
        assert!(validate_pair(&a, &b).is_err());

        let c = InstrumentRef::parse("MSFT").unwrap();
        assert!(validate_pair(&a, &c).is_ok());
    }
}

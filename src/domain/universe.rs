//! Trading universe: symbol lists, series loading and skip bookkeeping.

use crate::domain::config::DataConfig;
use crate::domain::error::TraderError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::retry::with_retry;
use crate::domain::sector::Sector;
use crate::ports::data_port::{DataPort, Timeframe};
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Splits a comma-separated list into upper-case symbols, rejecting blanks and repeats.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// The configured universe, or every tradable symbol the data port knows when
/// none is configured. Sector proxies and the benchmark are never traded.
pub fn resolve_universe(
    configured: &[String],
    data_port: &dyn DataPort,
    benchmark: &str,
) -> Result<Vec<String>, TraderError> {
    if !configured.is_empty() {
        return Ok(configured.to_vec());
    }
    let proxies: HashSet<&str> = Sector::TRADED
        .iter()
        .filter_map(|s| s.proxy_etf())
        .chain([benchmark])
        .collect();
    let symbols: Vec<String> = data_port
        .list_symbols()?
        .into_iter()
        .filter(|s| !proxies.contains(s.as_str()))
        .collect();
    tracing::info!(count = symbols.len(), "universe taken from data source");
    Ok(symbols)
}

/// Fetches `history_days` of daily bars ending at `as_of`, retrying transient
/// failures, and validates them into a [`PriceSeries`].
pub fn fetch_series(
    data_port: &dyn DataPort,
    symbol: &str,
    config: &DataConfig,
    as_of: NaiveDate,
) -> Result<PriceSeries, TraderError> {
    let start = as_of - Duration::days(config.history_days);
    let bars = with_retry(&config.retry, symbol, || {
        data_port.get_bars(symbol, Timeframe::Day, start, as_of)
    })?;
    PriceSeries::new(symbol, bars)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData(String),
    InsufficientHistory { rows: usize, minimum: usize },
    InvalidSeries(String),
    OrderFailed(String),
    ExitFailed(String),
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData(reason) => write!(f, "no data: {}", reason),
            SkipReason::InsufficientHistory { rows, minimum } => {
                write!(f, "only {} rows, minimum {} required", rows, minimum)
            }
            SkipReason::InvalidSeries(reason) => write!(f, "invalid series: {}", reason),
            SkipReason::OrderFailed(reason) => write!(f, "order failed: {}", reason),
            SkipReason::ExitFailed(reason) => write!(f, "exit check failed: {}", reason),
            SkipReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

impl SkipReason {
    /// Classifies a fetch or series error.
    pub fn from_error(err: &TraderError) -> Self {
        match err {
            TraderError::InvalidSeries { reason, .. } => SkipReason::InvalidSeries(reason.clone()),
            TraderError::DataInsufficient { rows, minimum, .. } => SkipReason::InsufficientHistory {
                rows: *rows,
                minimum: *minimum,
            },
            other => SkipReason::NoData(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::retry::RetryPolicy;
    use std::cell::Cell;

    struct FlakyPort {
        failures: Cell<u32>,
    }

    impl DataPort for FlakyPort {
        fn get_bars(
            &self,
            symbol: &str,
            _timeframe: Timeframe,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<OhlcvBar>, TraderError> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(TraderError::UpstreamUnavailable {
                    service: "feed".into(),
                    reason: "503".into(),
                });
            }
            Ok(vec![OhlcvBar {
                symbol: symbol.to_string(),
                date: start,
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.5,
                volume: 1000.0,
            }])
        }

        fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
            Ok(vec!["AAPL".into(), "SPY".into(), "XLK".into(), "MSFT".into()])
        }
    }

    #[test]
    fn test_parse_symbols_basic() {
        let result = parse_symbols("AAPL,MSFT,XOM").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "XOM"]);
    }

    #[test]
    fn test_parse_symbols_trims_and_uppercases() {
        let result = parse_symbols("  aapl , Msft ,xom").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "XOM"]);
    }

    #[test]
    fn test_parse_symbols_empty_token() {
        assert!(matches!(parse_symbols("AAPL,,MSFT"), Err(UniverseError::EmptyToken)));
    }

    #[test]
    fn test_parse_symbols_duplicate() {
        let result = parse_symbols("AAPL,MSFT,aapl");
        assert!(matches!(result, Err(UniverseError::DuplicateSymbol(s)) if s == "AAPL"));
    }

    #[test]
    fn configured_universe_wins() {
        let port = FlakyPort {
            failures: Cell::new(0),
        };
        let symbols = resolve_universe(&["NVDA".to_string()], &port, "SPY").unwrap();
        assert_eq!(symbols, vec!["NVDA"]);
    }

    #[test]
    fn listed_universe_excludes_proxies_and_benchmark() {
        let port = FlakyPort {
            failures: Cell::new(0),
        };
        let symbols = resolve_universe(&[], &port, "SPY").unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn fetch_series_retries_transient_failures() {
        let port = FlakyPort {
            failures: Cell::new(2),
        };
        let config = DataConfig {
            retry: RetryPolicy::no_delay(3),
            ..DataConfig::default()
        };
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let series = fetch_series(&port, "AAPL", &config, as_of).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(port.failures.get(), 0);
    }

    #[test]
    fn fetch_series_gives_up_after_budget() {
        let port = FlakyPort {
            failures: Cell::new(5),
        };
        let config = DataConfig {
            retry: RetryPolicy::no_delay(2),
            ..DataConfig::default()
        };
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let err = fetch_series(&port, "AAPL", &config, as_of).unwrap_err();
        assert!(matches!(err, TraderError::UpstreamUnavailable { .. }));
    }

    #[test]
    fn skip_reason_from_series_error() {
        let err = TraderError::InvalidSeries {
            symbol: "X".into(),
            reason: "duplicate date".into(),
        };
        assert_eq!(
            SkipReason::from_error(&err),
            SkipReason::InvalidSeries("duplicate date".into())
        );
    }
}

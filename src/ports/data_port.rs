//! Market data port trait.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::fmt;

/// Bar interval. Only daily bars drive the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    Day,
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::Day => f.write_str("1Day"),
        }
    }
}

pub trait DataPort {
    /// Bars for `symbol` with `start <= date <= end`, oldest first.
    ///
    /// Feed outages surface as [`TraderError::UpstreamUnavailable`] so callers
    /// can retry them.
    fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, TraderError>;
}

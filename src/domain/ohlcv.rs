//! Daily price bars and the validated series the indicator engine consumes.

use crate::domain::error::TraderError;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Traded notional on this bar (close x volume).
    pub fn notional(&self) -> f64 {
        self.close * self.volume
    }
}

/// An ordered, validated run of bars for one symbol.
///
/// Dates are strictly increasing, prices are finite and positive, volume is
/// finite and non-negative. Gaps between sessions are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, TraderError> {
        let symbol = symbol.into();
        let invalid = |reason: String| TraderError::InvalidSeries {
            symbol: symbol.clone(),
            reason,
        };

        for (i, bar) in bars.iter().enumerate() {
            let prices = [bar.open, bar.high, bar.low, bar.close];
            if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
                return Err(invalid(format!("non-positive or non-finite price on {}", bar.date)));
            }
            if !bar.volume.is_finite() || bar.volume < 0.0 {
                return Err(invalid(format!("invalid volume on {}", bar.date)));
            }
            if i > 0 {
                let prev = bars[i - 1].date;
                if bar.date == prev {
                    return Err(invalid(format!("duplicate date {}", bar.date)));
                }
                if bar.date < prev {
                    return Err(invalid(format!("date {} follows {}", bar.date, prev)));
                }
            }
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Percentage change of close over `sessions` bars ending at the last bar.
    pub fn pct_change(&self, sessions: usize) -> Option<f64> {
        let n = self.bars.len();
        if sessions == 0 || n <= sessions {
            return None;
        }
        let now = self.bars[n - 1].close;
        let then = self.bars[n - 1 - sessions].close;
        Some((now / then - 1.0) * 100.0)
    }
}

//! Persisted trade records.

use crate::domain::signal::Signal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One submitted entry order. Exit fields stay empty until a later run closes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub run_id: String,
    pub symbol: String,
    pub direction: String,
    pub entry_price: f64,
    pub shares: f64,
    pub entry_date: NaiveDate,
    pub exit_price: Option<f64>,
    pub exit_date: Option<NaiveDate>,
    pub signal_score: f64,
    pub sector: String,
    pub tier: String,
    pub market_regime: String,
    pub sector_regime: String,
    pub order_id: String,
}

impl TradeRecord {
    pub fn from_signal(
        run_id: &str,
        signal: &Signal,
        shares: f64,
        entry_date: NaiveDate,
        order_id: &str,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            symbol: signal.symbol.clone(),
            direction: signal.direction.as_str().to_string(),
            entry_price: signal.price,
            shares,
            entry_date,
            exit_price: None,
            exit_date: None,
            signal_score: signal.score,
            sector: signal.sector.name().to_string(),
            tier: signal.tier.as_str().to_string(),
            market_regime: signal.market_regime.as_str().to_string(),
            sector_regime: signal.sector_regime.as_str().to_string(),
            order_id: order_id.to_string(),
        }
    }
}

/// A position closed by the exit engine, with every factor that produced the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPositionRecord {
    pub run_id: String,
    pub symbol: String,
    pub direction: String,
    pub qty: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pl_pct: f64,
    pub exit_date: NaiveDate,
    pub reason: String,
    pub stop_type: String,
    pub market_regime: String,
    pub sector_regime: String,
    pub market_volatility: String,
    pub signal_quality: Option<f64>,
    pub position_age_days: Option<i64>,
    pub base_threshold: f64,
    pub atr_factor: f64,
    pub volatility_change_factor: f64,
    pub market_volatility_factor: f64,
    pub market_regime_factor: f64,
    pub sector_regime_factor: f64,
    pub signal_quality_factor: f64,
    pub time_factor: f64,
    pub adaptive_threshold: f64,
    pub trailing_threshold: Option<f64>,
    pub final_threshold: f64,
}

/// What the trade store knows about a held symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionHistory {
    pub entry_date: Option<NaiveDate>,
    /// Highest unrealized P/L seen so far, in percent.
    pub peak_plpc: Option<f64>,
}

impl PositionHistory {
    pub fn age_days(&self, as_of: NaiveDate) -> Option<i64> {
        self.entry_date.map(|d| (as_of - d).num_days())
    }
}

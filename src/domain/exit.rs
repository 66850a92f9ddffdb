//! Adaptive exit engine.
//!
//! The exit threshold starts at `stop_loss.base_threshold_pct` and is
//! scaled by seven factors: stock ATR%, change in stock volatility, market
//! volatility, market regime, sector regime, signal quality and position
//! age. Once a position has been profitable enough, a trailing level
//! computed from its peak profit takes over if it is higher.
//!
//! Thresholds and P/L are percentages throughout, e.g. `-2.0` for a two
//! percent loss.

use crate::domain::config::StrategyConfig;
use crate::domain::indicator::IndicatorFrame;
use crate::domain::market_context::{MarketContext, MarketVolatility};
use crate::domain::position::Position;
use crate::domain::regime::Regime;
use crate::domain::scoring::signal_quality;
use crate::domain::sector::Sector;
use crate::domain::trade::{ClosedPositionRecord, PositionHistory};
use chrono::NaiveDate;
use std::fmt;

const VOLATILITY_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFactors {
    pub atr: f64,
    pub volatility_change: f64,
    pub market_volatility: f64,
    pub market_regime: f64,
    pub sector_regime: f64,
    pub signal_quality: f64,
    pub time: f64,
}

impl Default for ExitFactors {
    fn default() -> Self {
        Self {
            atr: 1.0,
            volatility_change: 1.0,
            market_volatility: 1.0,
            market_regime: 1.0,
            sector_regime: 1.0,
            signal_quality: 1.0,
            time: 1.0,
        }
    }
}

impl ExitFactors {
    pub fn product(&self) -> f64 {
        self.atr
            * self.volatility_change
            * self.market_volatility
            * self.market_regime
            * self.sector_regime
            * self.signal_quality
            * self.time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopType {
    Adaptive,
    Trailing,
}

impl StopType {
    pub fn as_str(self) -> &'static str {
        match self {
            StopType::Adaptive => "adaptive",
            StopType::Trailing => "trailing",
        }
    }
}

impl fmt::Display for StopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the engine reads for one position.
#[derive(Debug, Clone, Copy)]
pub struct ExitInput<'a> {
    pub position: &'a Position,
    pub frame: &'a IndicatorFrame,
    pub context: &'a MarketContext,
    pub sector: Sector,
    pub history: &'a PositionHistory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitDecision {
    pub symbol: String,
    pub plpc_pct: f64,
    pub peak_plpc_pct: f64,
    pub atr_pct: f64,
    pub volatility_ratio: Option<f64>,
    pub signal_quality: f64,
    pub position_age_days: Option<i64>,
    pub market_regime: Regime,
    pub sector_regime: Regime,
    pub market_volatility: MarketVolatility,
    pub base_threshold: f64,
    pub factors: ExitFactors,
    pub adaptive_threshold: f64,
    pub trailing_threshold: Option<f64>,
    pub final_threshold: f64,
    pub stop_type: StopType,
    pub triggered: bool,
}

impl ExitDecision {
    pub fn closure_record(
        &self,
        run_id: &str,
        position: &Position,
        exit_date: NaiveDate,
    ) -> ClosedPositionRecord {
        ClosedPositionRecord {
            run_id: run_id.to_string(),
            symbol: self.symbol.clone(),
            direction: "LONG".to_string(),
            qty: position.qty.abs(),
            entry_price: position.avg_entry_price,
            exit_price: position.current_price,
            pl_pct: self.plpc_pct,
            exit_date,
            reason: "stop_loss".to_string(),
            stop_type: self.stop_type.as_str().to_string(),
            market_regime: self.market_regime.as_str().to_string(),
            sector_regime: self.sector_regime.as_str().to_string(),
            market_volatility: self.market_volatility.as_str().to_string(),
            signal_quality: Some(self.signal_quality),
            position_age_days: self.position_age_days,
            base_threshold: self.base_threshold,
            atr_factor: self.factors.atr,
            volatility_change_factor: self.factors.volatility_change,
            market_volatility_factor: self.factors.market_volatility,
            market_regime_factor: self.factors.market_regime,
            sector_regime_factor: self.factors.sector_regime,
            signal_quality_factor: self.factors.signal_quality,
            time_factor: self.factors.time,
            adaptive_threshold: self.adaptive_threshold,
            trailing_threshold: self.trailing_threshold,
            final_threshold: self.final_threshold,
        }
    }
}

/// Latest frame ATR over the mean of the last 20 ATR values.
pub fn volatility_ratio(frame: &IndicatorFrame) -> Option<f64> {
    let rows = frame.rows();
    if rows.len() < VOLATILITY_WINDOW {
        return None;
    }
    let recent = &rows[rows.len() - VOLATILITY_WINDOW..];
    let mean = recent.iter().map(|r| r.atr).sum::<f64>() / VOLATILITY_WINDOW as f64;
    let latest = recent.last()?.atr;
    (mean > 0.0).then(|| latest / mean)
}

fn atr_factor(atr_pct: f64) -> f64 {
    if atr_pct > 3.0 {
        1.5
    } else if atr_pct < 1.0 {
        0.8
    } else {
        1.0
    }
}

fn volatility_change_factor(ratio: Option<f64>) -> f64 {
    match ratio {
        Some(r) if r > 1.3 => 1.2,
        Some(r) if r < 0.8 => 0.9,
        _ => 1.0,
    }
}

fn market_volatility_factor(volatility: MarketVolatility) -> f64 {
    match volatility {
        MarketVolatility::High => 1.2,
        MarketVolatility::Low => 0.9,
        MarketVolatility::Normal => 1.0,
    }
}

fn quality_factor(quality: f64) -> f64 {
    if quality > 0.9 {
        1.3
    } else if quality > 0.8 {
        1.2
    } else if quality > 0.7 {
        1.1
    } else if quality < 0.3 {
        0.7
    } else if quality < 0.4 {
        0.8
    } else {
        1.0
    }
}

fn time_factor(age_days: Option<i64>) -> f64 {
    match age_days {
        Some(d) if d > 15 => 0.7,
        Some(d) if d > 10 => 0.8,
        Some(d) if d > 5 => 0.9,
        _ => 1.0,
    }
}

/// Trailing level for a position whose best P/L so far is `peak_pct`.
///
/// The highest tier reached locks in `max(lock_in, peak x retain)`.
pub fn trailing_threshold(peak_pct: f64, config: &StrategyConfig) -> Option<f64> {
    if !config.stop_loss.trailing.enabled {
        return None;
    }
    config
        .stop_loss
        .trailing
        .tiers
        .iter()
        .filter(|t| peak_pct >= t.threshold_pct)
        .max_by(|a, b| a.threshold_pct.total_cmp(&b.threshold_pct))
        .map(|t| t.lock_in_pct.max(peak_pct * t.retain))
}

/// Computes the exit threshold for a long position. Returns `None` for
/// short or flat positions, which are not evaluated.
pub fn evaluate_exit(input: &ExitInput<'_>, config: &StrategyConfig) -> Option<ExitDecision> {
    let position = input.position;
    if !position.is_long() {
        return None;
    }
    let latest = input.frame.latest()?;
    let sl = &config.stop_loss;
    let adaptive_cfg = &sl.adaptive;

    let plpc_pct = position.plpc_pct();
    let atr_pct = if position.current_price > 0.0 {
        latest.atr / position.current_price * 100.0
    } else {
        latest.atr_pct()
    };
    let ratio = volatility_ratio(input.frame);
    let quality = signal_quality(latest);
    let age = input.history.age_days(input.context.as_of);
    let market_regime = input.context.market_regime();
    let sector_regime = input.context.sector_regime(input.sector);
    let market_volatility = input.context.volatility;

    let mut factors = ExitFactors::default();
    if adaptive_cfg.enabled {
        if adaptive_cfg.volatility_scaling {
            factors.atr = atr_factor(atr_pct);
            factors.volatility_change = volatility_change_factor(ratio);
            factors.market_volatility = market_volatility_factor(market_volatility);
        }
        if adaptive_cfg.market_regime_scaling {
            factors.market_regime = sl.regime_factors.get(market_regime);
        }
        if adaptive_cfg.sector_regime_scaling {
            factors.sector_regime = sl.regime_factors.get(sector_regime);
        }
        if adaptive_cfg.signal_quality_scaling {
            factors.signal_quality = quality_factor(quality);
        }
        if adaptive_cfg.time_scaling {
            factors.time = time_factor(age);
        }
    }

    let adaptive = sl.base_threshold_pct * factors.product();
    let peak = input
        .history
        .peak_plpc
        .map_or(plpc_pct, |stored| stored.max(plpc_pct));
    let trailing = trailing_threshold(peak, config);

    let (final_threshold, stop_type) = match trailing {
        Some(t) if t > adaptive => (t, StopType::Trailing),
        _ => (adaptive, StopType::Adaptive),
    };
    let triggered = sl.enabled && plpc_pct <= final_threshold;

    tracing::debug!(
        symbol = %position.symbol,
        plpc_pct,
        peak,
        base = sl.base_threshold_pct,
        ?factors,
        adaptive,
        ?trailing,
        final_threshold,
        stop_type = %stop_type,
        triggered,
        "exit threshold"
    );

    Some(ExitDecision {
        symbol: position.symbol.clone(),
        plpc_pct,
        peak_plpc_pct: peak,
        atr_pct,
        volatility_ratio: ratio,
        signal_quality: quality,
        position_age_days: age,
        market_regime,
        sector_regime,
        market_volatility,
        base_threshold: sl.base_threshold_pct,
        factors,
        adaptive_threshold: adaptive,
        trailing_threshold: trailing,
        final_threshold,
        stop_type,
        triggered,
    })
}

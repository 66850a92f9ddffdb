//! Long-signal scoring.
//!
//! A score is the sum of seven component contributions (RSI, MACD,
//! Bollinger, moving averages, volume, volatility and the regime bonus)
//! clamped to `[0, 1]`. Every component reads only the last two rows of the
//! frame plus short trailing windows, so scoring never looks ahead.

use crate::domain::config::StrategyConfig;
use crate::domain::indicator::{IndicatorFrame, IndicatorRow};
use crate::domain::market_context::MarketContext;
use crate::domain::regime::{Regime, RegimeTable};
use crate::domain::sector::SectorMap;
use crate::domain::signal::{Direction, Signal, Tier};

/// Fewest frame rows a score is computed from.
pub const MIN_SCORING_ROWS: usize = 10;

const VOLUME_WINDOW: usize = 5;
const VOLUME_SURGE: f64 = 1.2;
const VOLUME_SKEW: f64 = 1.5;
const HIGH_ATR_PCT: f64 = 3.0;

/// Per-component contributions before the clamp.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub rsi: f64,
    pub macd: f64,
    pub bollinger: f64,
    pub moving_average: f64,
    pub volume: f64,
    pub volatility: f64,
    pub regime: f64,
}

impl ScoreBreakdown {
    pub fn raw(&self) -> f64 {
        self.rsi
            + self.macd
            + self.bollinger
            + self.moving_average
            + self.volume
            + self.volatility
            + self.regime
    }

    pub fn score(&self) -> f64 {
        self.raw().clamp(0.0, 1.0)
    }
}

pub fn score_signal(
    frame: &IndicatorFrame,
    market: Regime,
    sector: Regime,
    bonus: &RegimeTable,
) -> Option<f64> {
    score_breakdown(frame.rows(), market, sector, bonus).map(|b| b.score())
}

/// Scores the latest row of `rows`. `None` with fewer than [`MIN_SCORING_ROWS`] rows.
pub fn score_breakdown(
    rows: &[IndicatorRow],
    market: Regime,
    sector: Regime,
    bonus: &RegimeTable,
) -> Option<ScoreBreakdown> {
    let n = rows.len();
    if n < MIN_SCORING_ROWS {
        return None;
    }
    let cur = &rows[n - 1];
    let prev = &rows[n - 2];
    let bullish = market.is_bullish();
    let bearish = market.is_bearish();

    let mut b = ScoreBreakdown::default();

    b.rsi = if cur.rsi < 20.0 {
        0.5
    } else if cur.rsi < 30.0 {
        0.35
    } else if cur.rsi < 40.0 {
        0.2
    } else {
        0.0
    };
    if bearish && cur.rsi > 35.0 {
        b.rsi -= 0.15;
    } else if bullish && cur.rsi < 45.0 {
        b.rsi += 0.1;
    }

    if cur.macd > cur.macd_signal && prev.macd <= prev.macd_signal {
        b.macd += 0.3;
    }
    if cur.macd_hist > 0.0 && cur.macd_hist > prev.macd_hist {
        b.macd += 0.2;
    } else if cur.macd_hist < 0.0 && cur.macd_hist > prev.macd_hist {
        b.macd += 0.15;
    }
    if bullish && cur.macd > cur.macd_signal {
        b.macd += 0.1;
    } else if bearish && cur.macd < 0.0 && cur.macd_signal < 0.0 {
        b.macd -= 0.1;
    }

    if cur.close <= cur.lower_band {
        b.bollinger += 0.4;
    } else if cur.band_position().is_some_and(|p| p < 0.2) {
        b.bollinger += 0.25;
    }
    if cur.band_width() < prev.band_width() {
        b.bollinger += 0.1;
    }

    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let sma20 = tail_mean(&closes, 20);
    let sma50 = tail_mean(&closes, 50);
    if cur.close > sma20 {
        b.moving_average += 0.15;
    }
    if cur.close > sma50 {
        b.moving_average += 0.15;
    }
    if sma20 > sma50 {
        b.moving_average += 0.2;
    }
    if bullish && cur.close > sma20 && sma20 > sma50 {
        b.moving_average += 0.1;
    }

    let volumes: Vec<f64> = rows.iter().map(|r| r.volume).collect();
    if cur.volume > tail_mean(&volumes, VOLUME_WINDOW) * VOLUME_SURGE && cur.close > prev.close {
        b.volume += 0.2;
    }
    let (mut up, mut down) = (Vec::new(), Vec::new());
    for i in n - VOLUME_WINDOW..n {
        if rows[i].close > rows[i - 1].close {
            up.push(rows[i].volume);
        } else {
            down.push(rows[i].volume);
        }
    }
    if !up.is_empty() && !down.is_empty() {
        let up_avg = up.iter().sum::<f64>() / up.len() as f64;
        let down_avg = down.iter().sum::<f64>() / down.len() as f64;
        if up_avg > down_avg * VOLUME_SKEW {
            b.volume += 1.0;
        } else if down_avg > up_avg * VOLUME_SKEW {
            b.volume -= 1.0;
        }
    }

    if cur.atr_pct() > HIGH_ATR_PCT {
        b.volatility = if bullish { 0.1 } else { -0.1 };
    }

    b.regime = bonus.get(market) + bonus.get(sector);

    Some(b)
}

fn tail_mean(values: &[f64], window: usize) -> f64 {
    let w = window.min(values.len());
    if w == 0 {
        return 0.0;
    }
    values[values.len() - w..].iter().sum::<f64>() / w as f64
}

/// Exit-engine view of how supportive the latest row still is, in `[0, 1]`.
///
/// 0.3 x RSI term + 0.3 x MACD term + 0.4 x band term.
pub fn signal_quality(row: &IndicatorRow) -> f64 {
    let rsi_score = if row.rsi < 30.0 {
        1.0
    } else if row.rsi > 70.0 {
        0.0
    } else {
        1.0 - (row.rsi - 30.0) / 40.0
    };
    let macd_score = if row.macd > row.macd_signal { 1.0 } else { 0.0 };
    let bb_score = if row.close < row.lower_band {
        1.0
    } else if row.close > row.upper_band {
        0.0
    } else {
        row.band_position().map(|p| 1.0 - p).unwrap_or(0.5)
    };
    (0.3 * rsi_score + 0.3 * macd_score + 0.4 * bb_score).clamp(0.0, 1.0)
}

/// Applies the liquidity filter and the regime-adjusted threshold to one
/// symbol's frame. `priority` and `is_midcap` are left for the balancer.
pub fn evaluate_candidate(
    frame: &IndicatorFrame,
    ctx: &MarketContext,
    config: &StrategyConfig,
    sector_map: &SectorMap,
) -> Option<Signal> {
    let symbol = frame.symbol();
    let latest = frame.latest()?;
    let notional = latest.close * latest.volume;
    if notional < config.signals.min_liquidity {
        tracing::debug!(symbol, notional, "below liquidity floor");
        return None;
    }

    let sector = sector_map.sector_of(symbol);
    let market_regime = ctx.market_regime();
    let sector_regime = ctx.sector_regime(sector);
    let breakdown = score_breakdown(
        frame.rows(),
        market_regime,
        sector_regime,
        &config.signals.regime_bonus,
    )?;
    let score = breakdown.score();
    let threshold = config.signals.long_signal_threshold
        * config.signals.threshold_multipliers.get(market_regime);

    tracing::debug!(symbol, score, threshold, ?breakdown, "scored");
    if score <= threshold {
        return None;
    }

    Some(Signal {
        symbol: symbol.to_string(),
        direction: Direction::Long,
        score,
        tier: Tier::from_score(score, &config.signals.tiers),
        sector,
        sector_regime,
        market_regime,
        price: latest.close,
        volume: latest.volume,
        priority: score,
        is_midcap: false,
    })
}

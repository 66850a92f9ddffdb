//! Position sizing.

use crate::domain::config::StrategyConfig;
use crate::domain::signal::{Signal, Tier};

/// Top-of-tier bonus for Tier 1: scales from 1.0 at `tier1_min` to 1.5 at a perfect score.
const TIER1_SCORE_SPAN: f64 = 0.5;

pub fn tier_multiplier(tier: Tier, config: &StrategyConfig) -> f64 {
    match tier {
        Tier::Tier1 => config.sizing.tier1_multiplier,
        Tier::Tier2 => config.sizing.tier2_multiplier,
        Tier::BelowThreshold => config.sizing.below_threshold_multiplier,
    }
}

/// Dollar amount to commit to `signal`, never negative and never above
/// `max_buying_power_fraction` of `buying_power`. Rounded to cents.
pub fn position_size(signal: &Signal, buying_power: f64, config: &StrategyConfig) -> f64 {
    let sizing = &config.sizing;
    let tier = Tier::from_score(signal.score, &config.signals.tiers);
    let mut multiplier = tier_multiplier(tier, config);
    if multiplier <= 0.0 {
        return 0.0;
    }

    if tier == Tier::Tier1 {
        let t1 = config.signals.tiers.tier1_min;
        if t1 < 1.0 {
            multiplier *= 1.0 + ((signal.score - t1) / (1.0 - t1)) * TIER1_SCORE_SPAN;
        }
    }

    let base = sizing.base_position_pct / 100.0 * sizing.initial_capital;
    let sector_weight = config.sector_weights.weight(signal.sector);
    let mut size = base * multiplier * sizing.long_multiplier * sector_weight;

    if signal.is_midcap {
        size *= config.midcap.position_factor;
    }
    size *= sizing.regime_multipliers.get(signal.market_regime);

    let size = size
        .min(buying_power * sizing.max_buying_power_fraction)
        .max(0.0);
    let size = round_cents(size);

    tracing::debug!(
        symbol = %signal.symbol,
        size,
        score = signal.score,
        tier = %tier,
        sector = %signal.sector,
        sector_weight,
        midcap = signal.is_midcap,
        "position sized"
    );
    size
}

/// Whole-cent rounding.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Shares affordable with `size` at `price`, to two decimals (fractional shares).
pub fn shares_for(size: f64, price: f64) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    (size / price * 100.0).round() / 100.0
}

//! Configuration validation.
//!
//! Runs over the typed [`StrategyConfig`] once, before any cycle starts.

use crate::domain::config::StrategyConfig;
use crate::domain::error::TraderError;

pub fn validate_strategy_config(config: &StrategyConfig) -> Result<(), TraderError> {
    validate_indicators(config)?;
    validate_signals(config)?;
    validate_sizing(config)?;
    validate_midcap(config)?;
    validate_execution(config)?;
    validate_stop_loss(config)?;
    validate_simulation(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn check_percentage(section: &str, key: &str, value: f64) -> Result<(), TraderError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(invalid(section, key, "must be between 0 and 100"));
    }
    Ok(())
}

fn check_fraction(section: &str, key: &str, value: f64) -> Result<(), TraderError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(section, key, "must be between 0 and 1"));
    }
    Ok(())
}

fn validate_indicators(config: &StrategyConfig) -> Result<(), TraderError> {
    let p = &config.indicators;
    let periods = [
        ("rsi_period", p.rsi_period),
        ("macd_fast", p.macd_fast),
        ("macd_slow", p.macd_slow),
        ("macd_signal", p.macd_signal),
        ("bb_period", p.bb_period),
        ("atr_period", p.atr_period),
        ("volume_period", p.volume_period),
        ("momentum_period", p.momentum_period),
    ];
    for (key, period) in periods {
        if period == 0 {
            return Err(invalid("indicators", key, "period must be at least 1"));
        }
    }
    if p.macd_fast >= p.macd_slow {
        return Err(invalid(
            "indicators",
            "macd_fast",
            "macd_fast must be less than macd_slow",
        ));
    }
    if p.bb_std_mult <= 0.0 {
        return Err(invalid("indicators", "bb_std", "bb_std must be positive"));
    }
    Ok(())
}

fn validate_signals(config: &StrategyConfig) -> Result<(), TraderError> {
    let s = &config.signals;
    check_fraction("signals", "long_signal_threshold", s.long_signal_threshold)?;
    check_fraction("signals", "tier1_min", s.tiers.tier1_min)?;
    check_fraction("signals", "tier2_min", s.tiers.tier2_min)?;
    if s.tiers.tier2_min > s.tiers.tier1_min {
        return Err(invalid(
            "signals",
            "tier2_min",
            "tier2_min must not exceed tier1_min",
        ));
    }
    if s.min_liquidity < 0.0 {
        return Err(invalid(
            "signals",
            "min_liquidity",
            "min_liquidity must be non-negative",
        ));
    }
    Ok(())
}

fn validate_sizing(config: &StrategyConfig) -> Result<(), TraderError> {
    let z = &config.sizing;
    if z.initial_capital <= 0.0 {
        return Err(invalid(
            "sizing",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    check_percentage("sizing", "base_position_pct", z.base_position_pct)?;
    check_fraction(
        "sizing",
        "max_buying_power_fraction",
        z.max_buying_power_fraction,
    )?;
    let multipliers = [
        ("tier1_multiplier", z.tier1_multiplier),
        ("tier2_multiplier", z.tier2_multiplier),
        ("below_threshold_multiplier", z.below_threshold_multiplier),
        ("long_multiplier", z.long_multiplier),
    ];
    for (key, value) in multipliers {
        if value < 0.0 {
            return Err(invalid("sizing", key, "multiplier must be non-negative"));
        }
    }
    Ok(())
}

fn validate_midcap(config: &StrategyConfig) -> Result<(), TraderError> {
    check_percentage(
        "midcap",
        "large_cap_percentage",
        config.midcap.large_cap_percentage,
    )?;
    if config.midcap.position_factor < 0.0 {
        return Err(invalid(
            "midcap",
            "position_factor",
            "position_factor must be non-negative",
        ));
    }
    Ok(())
}

fn validate_execution(config: &StrategyConfig) -> Result<(), TraderError> {
    let e = &config.execution;
    if e.max_trades_per_run == 0 {
        return Err(invalid(
            "execution",
            "max_trades_per_run",
            "max_trades_per_run must be at least 1",
        ));
    }
    if e.max_capital_per_direction <= 0.0 {
        return Err(invalid(
            "execution",
            "max_capital_per_direction",
            "max_capital_per_direction must be positive",
        ));
    }
    check_fraction("execution", "sector_cap_fraction", e.sector_cap_fraction)?;
    Ok(())
}

fn validate_stop_loss(config: &StrategyConfig) -> Result<(), TraderError> {
    let l = &config.stop_loss;
    if l.base_threshold_pct > 0.0 {
        return Err(invalid(
            "stop_loss",
            "base_threshold_pct",
            "base_threshold_pct must be zero or negative",
        ));
    }
    for (i, tier) in l.trailing.tiers.iter().enumerate() {
        check_fraction(
            "stop_loss.trailing",
            &format!("tier{}_retain", i + 1),
            tier.retain,
        )?;
    }
    let descending = l
        .trailing
        .tiers
        .windows(2)
        .all(|w| w[0].threshold_pct >= w[1].threshold_pct);
    if !descending {
        return Err(invalid(
            "stop_loss.trailing",
            "tier1_threshold",
            "tier thresholds must be ordered from highest to lowest",
        ));
    }
    Ok(())
}

fn validate_simulation(config: &StrategyConfig) -> Result<(), TraderError> {
    let s = &config.simulation;
    check_fraction("simulation", "base_win_rate", s.base_win_rate)?;
    if s.noise_std < 0.0 || s.holding_std < 0.0 {
        return Err(invalid(
            "simulation",
            "noise_std",
            "standard deviations must be non-negative",
        ));
    }
    Ok(())
}

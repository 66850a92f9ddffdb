//! Signal balancing: priority, hard sector cap and large/mid-cap reconciliation.

use crate::domain::config::StrategyConfig;
use crate::domain::regime::Regime;
use crate::domain::sector::Sector;
use crate::domain::signal::{Direction, Signal};
use std::cmp::Ordering;
use std::collections::HashMap;

const SECTOR_BULLISH_BOOST: f64 = 0.1;
const SECTOR_STRONG_BOOST: f64 = 0.1;
const MARKET_BULLISH_BOOST: f64 = 0.05;
const LONG_BONUS: f64 = 0.15;
const SECTOR_STRONG_BEARISH_PENALTY: f64 = 0.15;
const MIDCAP_BOOST: f64 = 0.05;
const MIDCAP_BOOST_SCALE: f64 = 30.0;
const PROMOTION_NUDGE: f64 = 0.001;

/// Counts accepted signals per sector against a fixed cap.
#[derive(Debug, Clone)]
pub struct SectorExposure {
    cap: usize,
    counts: HashMap<Sector, usize>,
}

impl SectorExposure {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            counts: HashMap::new(),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn count(&self, sector: Sector) -> usize {
        self.counts.get(&sector).copied().unwrap_or(0)
    }

    /// Takes a slot for `sector` if one is free.
    pub fn try_claim(&mut self, sector: Sector) -> bool {
        let count = self.counts.entry(sector).or_insert(0);
        if *count >= self.cap {
            return false;
        }
        *count += 1;
        true
    }

    pub fn release(&mut self, sector: Sector) {
        if let Some(count) = self.counts.get_mut(&sector) {
            *count = count.saturating_sub(1);
        }
    }
}

/// Sets `priority` and `is_midcap` on `signal`.
pub fn prioritize(signal: &mut Signal, config: &StrategyConfig) {
    let mut priority = signal.score * config.sector_weights.weight(signal.sector);

    if signal.sector_regime.is_bullish() {
        priority += SECTOR_BULLISH_BOOST;
        if signal.sector_regime == Regime::StrongBullish {
            priority += SECTOR_STRONG_BOOST;
        }
    }
    if signal.market_regime.is_bullish() {
        priority += MARKET_BULLISH_BOOST;
    }
    if signal.direction == Direction::Long {
        priority += LONG_BONUS;
    }
    if signal.sector_regime == Regime::StrongBearish {
        priority -= SECTOR_STRONG_BEARISH_PENALTY;
    }

    signal.is_midcap = config.midcap.include && config.midcap.is_midcap(&signal.symbol);
    if signal.is_midcap {
        priority += MIDCAP_BOOST * (config.midcap.midcap_percentage() / MIDCAP_BOOST_SCALE);
    }

    signal.priority = priority;
}

/// Priority descending, then symbol ascending.
pub fn by_priority(a: &Signal, b: &Signal) -> Ordering {
    b.priority
        .total_cmp(&a.priority)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Prioritizes, caps per sector and reconciles the cap-tier split.
///
/// Returns at most `max_trades_per_run` signals ordered by [`by_priority`].
pub fn balance(mut signals: Vec<Signal>, config: &StrategyConfig) -> Vec<Signal> {
    for signal in &mut signals {
        prioritize(signal, config);
    }
    signals.sort_by(by_priority);

    let trade_cap = config.execution.max_trades_per_run;
    let sector_cap = config.execution.sector_cap();

    let mut exposure = SectorExposure::new(sector_cap);
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for signal in signals {
        if accepted.len() < trade_cap && exposure.try_claim(signal.sector) {
            accepted.push(signal);
        } else {
            rejected.push(signal);
        }
    }

    if config.midcap.include && !accepted.is_empty() {
        reconcile_cap_tiers(&mut accepted, &mut rejected, &mut exposure, config);
    }

    let mid = accepted.iter().filter(|s| s.is_midcap).count();
    tracing::info!(
        selected = accepted.len(),
        rejected = rejected.len(),
        large_cap = accepted.len() - mid,
        mid_cap = mid,
        sector_cap,
        "signals balanced"
    );
    accepted
}

fn reconcile_cap_tiers(
    accepted: &mut Vec<Signal>,
    rejected: &mut Vec<Signal>,
    exposure: &mut SectorExposure,
    config: &StrategyConfig,
) {
    let trade_cap = config.execution.max_trades_per_run;
    let target_large =
        (trade_cap as f64 * config.midcap.large_cap_percentage / 100.0).floor() as usize;
    let target_mid = trade_cap - target_large;

    loop {
        let mid_count = accepted.iter().filter(|s| s.is_midcap).count();
        let promote_mid = match mid_count.cmp(&target_mid) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => break,
        };

        // accepted is sorted, so the last match is the lowest priority
        let Some(demote_idx) = accepted.iter().rposition(|s| s.is_midcap != promote_mid) else {
            break;
        };
        let demoted_sector = accepted[demote_idx].sector;
        let Some(promote_idx) = rejected.iter().position(|s| {
            s.is_midcap == promote_mid
                && (s.sector == demoted_sector || exposure.count(s.sector) < exposure.cap())
        }) else {
            break;
        };

        let demoted = accepted.remove(demote_idx);
        let mut promoted = rejected.remove(promote_idx);
        promoted.priority = demoted.priority + PROMOTION_NUDGE;
        exposure.release(demoted.sector);
        exposure.try_claim(promoted.sector);
        tracing::debug!(
            promoted = %promoted.symbol,
            demoted = %demoted.symbol,
            "cap-tier swap"
        );

        accepted.push(promoted);
        accepted.sort_by(by_priority);
        let pos = rejected
            .binary_search_by(|s| by_priority(s, &demoted))
            .unwrap_or_else(|p| p);
        rejected.insert(pos, demoted);
    }

    let mid_count = accepted.iter().filter(|s| s.is_midcap).count();
    if mid_count != target_mid {
        tracing::info!(
            target_mid,
            mid_count,
            "cap-tier split not reachable with available candidates"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Tier;

    fn signal(symbol: &str, score: f64, sector: Sector) -> Signal {
        Signal {
            symbol: symbol.into(),
            direction: Direction::Long,
            score,
            tier: Tier::BelowThreshold,
            sector,
            sector_regime: Regime::Neutral,
            market_regime: Regime::Neutral,
            price: 50.0,
            volume: 1_000_000.0,
            priority: 0.0,
            is_midcap: false,
        }
    }

    #[test]
    fn priority_components() {
        let config = StrategyConfig::default();
        let mut s = signal("AAPL", 0.8, Sector::Technology);
        s.sector_regime = Regime::StrongBullish;
        s.market_regime = Regime::Bullish;
        prioritize(&mut s, &config);
        // 0.8 x 1.5 + 0.1 + 0.1 + 0.05 + 0.15
        assert!((s.priority - 1.6).abs() < 1e-12);
        assert!(!s.is_midcap);
    }

    #[test]
    fn strong_bearish_sector_penalized() {
        let config = StrategyConfig::default();
        let mut s = signal("XOM", 0.6, Sector::Energy);
        s.sector_regime = Regime::StrongBearish;
        prioritize(&mut s, &config);
        assert!((s.priority - (0.6 * 1.1 + 0.15 - 0.15)).abs() < 1e-12);
    }

    #[test]
    fn midcap_boost_scales_with_share() {
        let mut config = StrategyConfig::default();
        config.midcap.include = true;
        config.midcap.symbols.insert("ETSY".into());
        let mut s = signal("ETSY", 0.6, Sector::Unknown);
        prioritize(&mut s, &config);
        assert!(s.is_midcap);
        // 0.6 + 0.15 + 0.05 x (30 / 30)
        assert!((s.priority - 0.8).abs() < 1e-12);
    }

    #[test]
    fn midcap_flag_requires_include() {
        let mut config = StrategyConfig::default();
        config.midcap.symbols.insert("ETSY".into());
        let mut s = signal("ETSY", 0.6, Sector::Unknown);
        prioritize(&mut s, &config);
        assert!(!s.is_midcap);
    }

    #[test]
    fn ties_break_by_symbol() {
        let config = StrategyConfig::default();
        let out = balance(
            vec![
                signal("ZZZ", 0.7, Sector::Energy),
                signal("AAA", 0.7, Sector::Energy),
            ],
            &config,
        );
        assert_eq!(out[0].symbol, "AAA");
        assert_eq!(out[1].symbol, "ZZZ");
    }

    #[test]
    fn sector_cap_is_hard() {
        let mut config = StrategyConfig::default();
        config.execution.max_trades_per_run = 10;
        let signals: Vec<Signal> = (0..6)
            .map(|i| signal(&format!("T{i}"), 0.9 - i as f64 * 0.01, Sector::Technology))
            .chain([signal("XOM", 0.55, Sector::Energy)])
            .collect();
        let out = balance(signals, &config);
        let tech = out.iter().filter(|s| s.sector == Sector::Technology).count();
        assert_eq!(tech, 3);
        assert_eq!(out.len(), 4);
        assert!(out.iter().any(|s| s.symbol == "XOM"));
    }

    #[test]
    fn output_never_exceeds_trade_cap() {
        let mut config = StrategyConfig::default();
        config.execution.max_trades_per_run = 2;
        let sectors = [Sector::Energy, Sector::Utilities, Sector::Materials];
        let signals = sectors
            .iter()
            .enumerate()
            .map(|(i, s)| signal(&format!("S{i}"), 0.7, *s))
            .collect();
        assert_eq!(balance(signals, &config).len(), 2);
    }

    #[test]
    fn swaps_in_midcaps_to_meet_target() {
        let mut config = StrategyConfig::default();
        config.execution.max_trades_per_run = 10;
        config.midcap.include = true;
        let sectors = Sector::TRADED;
        let mut signals = Vec::new();
        for i in 0..10 {
            signals.push(signal(&format!("L{i}"), 0.95, sectors[i % sectors.len()]));
        }
        for i in 0..5 {
            let symbol = format!("M{i}");
            config.midcap.symbols.insert(symbol.clone());
            signals.push(signal(&symbol, 0.55, sectors[(i + 3) % sectors.len()]));
        }
        let out = balance(signals, &config);
        assert_eq!(out.len(), 10);
        assert_eq!(out.iter().filter(|s| s.is_midcap).count(), 3);
        // the three lowest-weighted large-caps (Real Estate, Energy, Consumer Staples) make room
        for gone in ["L9", "L3", "L6"] {
            assert!(out.iter().all(|s| s.symbol != gone), "{gone} should be demoted");
        }
        let ordered = out.windows(2).all(|w| by_priority(&w[0], &w[1]) != Ordering::Greater);
        assert!(ordered);
    }

    #[test]
    fn swaps_out_excess_midcaps() {
        let mut config = StrategyConfig::default();
        config.execution.max_trades_per_run = 10;
        config.midcap.include = true;
        let sectors = Sector::TRADED;
        let mut signals = Vec::new();
        for i in 0..10 {
            let symbol = format!("M{i}");
            config.midcap.symbols.insert(symbol.clone());
            signals.push(signal(&symbol, 0.95, sectors[i % sectors.len()]));
        }
        for i in 0..10 {
            signals.push(signal(&format!("L{i}"), 0.5, sectors[i % sectors.len()]));
        }
        let out = balance(signals, &config);
        assert_eq!(out.iter().filter(|s| s.is_midcap).count(), 3);
        assert_eq!(out.iter().filter(|s| !s.is_midcap).count(), 7);
    }

    #[test]
    fn swap_respects_sector_cap() {
        let mut config = StrategyConfig::default();
        config.execution.max_trades_per_run = 4;
        config.execution.min_sector_slots = 1;
        config.midcap.include = true;
        config.midcap.large_cap_percentage = 50.0;
        config.midcap.symbols.insert("MID".into());
        // four large-caps in four sectors, the only mid-cap shares a sector with a high-ranked large-cap
        let signals = vec![
            signal("L0", 0.95, Sector::Technology),
            signal("L1", 0.95, Sector::Energy),
            signal("L2", 0.95, Sector::Materials),
            signal("L3", 0.95, Sector::Utilities),
            signal("MID", 0.5, Sector::Technology),
        ];
        let out = balance(signals, &config);
        // lowest-ranked large-cap is Energy; swapping in MID would put two in Technology
        assert!(out.iter().all(|s| !s.is_midcap));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn exposure_claims_until_cap() {
        let mut exposure = SectorExposure::new(2);
        assert!(exposure.try_claim(Sector::Energy));
        assert!(exposure.try_claim(Sector::Energy));
        assert!(!exposure.try_claim(Sector::Energy));
        exposure.release(Sector::Energy);
        assert!(exposure.try_claim(Sector::Energy));
        assert_eq!(exposure.count(Sector::Utilities), 0);
    }
}

//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Sector cap: no balanced list holds more than the cap for any sector
//! 2. Cap-tier split: with ample candidates the mid-cap target is met
//! 3. Score bounds: every score lands in [0, 1]
//! 4. Sizing: size never falls as the score rises, and stays under the buying power limit
//! 5. Exit thresholds: a higher ATR% never tightens the adaptive stop
//! 6. Simulation: a fixed seed replays the same run

mod common;

use common::*;
use proptest::prelude::*;
use regimetrader::domain::balancer::balance;
use regimetrader::domain::config::StrategyConfig;
use regimetrader::domain::exit::{ExitInput, evaluate_exit, trailing_threshold};
use regimetrader::domain::indicator::{IndicatorParams, IndicatorRow, compute_indicators};
use regimetrader::domain::market_context::MarketContext;
use regimetrader::domain::metrics::SimulationMetrics;
use regimetrader::domain::ohlcv::PriceSeries;
use regimetrader::domain::position::Position;
use regimetrader::domain::regime::Regime;
use regimetrader::domain::scoring::score_breakdown;
use regimetrader::domain::sector::Sector;
use regimetrader::domain::signal::{Direction, Signal, Tier};
use regimetrader::domain::simulator::{OutcomeSimulator, SyntheticSimulator};
use regimetrader::domain::sizing::position_size;
use regimetrader::domain::trade::PositionHistory;
use std::collections::HashMap;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_sector() -> impl Strategy<Value = Sector> {
    (0..Sector::TRADED.len()).prop_map(|i| Sector::TRADED[i])
}

fn arb_regime() -> impl Strategy<Value = Regime> {
    prop_oneof![
        Just(Regime::StrongBearish),
        Just(Regime::Bearish),
        Just(Regime::Neutral),
        Just(Regime::Bullish),
        Just(Regime::StrongBullish),
    ]
}

fn arb_score() -> impl Strategy<Value = f64> {
    (0.5..1.0_f64).prop_map(|s| (s * 1000.0).round() / 1000.0)
}

fn make_signal(i: usize, score: f64, sector: Sector, regime: Regime) -> Signal {
    Signal {
        symbol: format!("S{i:03}"),
        direction: Direction::Long,
        score,
        tier: Tier::from_score(score, &Default::default()),
        sector,
        sector_regime: regime,
        market_regime: regime,
        price: 25.0,
        volume: 1_000_000.0,
        priority: score,
        is_midcap: false,
    }
}

fn arb_signals(max: usize) -> impl Strategy<Value = Vec<Signal>> {
    prop::collection::vec((arb_score(), arb_sector(), arb_regime()), 0..max).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (score, sector, regime))| make_signal(i, score, sector, regime))
            .collect()
    })
}

fn arb_row() -> impl Strategy<Value = IndicatorRow> {
    (
        1.0..500.0_f64,
        0.0..100.0_f64,
        -5.0..5.0_f64,
        -5.0..5.0_f64,
        0.0..0.2_f64,
        0.0..0.1_f64,
        0.0..5_000_000.0_f64,
    )
        .prop_map(|(close, rsi, macd, signal, width, atr_frac, volume)| IndicatorRow {
            date: as_of(),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume,
            rsi,
            macd,
            macd_signal: signal,
            macd_hist: macd - signal,
            sma: close,
            std: close * width / 4.0,
            upper_band: close * (1.0 + width / 2.0),
            lower_band: close * (1.0 - width / 2.0),
            atr: close * atr_frac,
            volume_sma: volume,
            volume_ratio: 1.0,
            momentum: 0.0,
            price_change_1d: 0.0,
            price_change_5d: 0.0,
        })
}

// ── 1. Sector cap ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn balanced_list_respects_caps(
        signals in arb_signals(80),
        trade_cap in 1usize..40,
        min_slots in 1usize..5,
        include_midcap in any::<bool>(),
    ) {
        let mut config = StrategyConfig::default();
        config.execution.max_trades_per_run = trade_cap;
        config.execution.min_sector_slots = min_slots;
        config.midcap.include = include_midcap;
        config.midcap.symbols = signals
            .iter()
            .step_by(3)
            .map(|s| s.symbol.clone())
            .collect();
        let sector_cap = config.execution.sector_cap();
        let total = signals.len();

        let selected = balance(signals, &config);

        prop_assert!(selected.len() <= trade_cap);
        prop_assert!(selected.len() <= total);
        let mut per_sector: HashMap<Sector, usize> = HashMap::new();
        for s in &selected {
            *per_sector.entry(s.sector).or_insert(0) += 1;
        }
        for count in per_sector.values() {
            prop_assert!(*count <= sector_cap);
        }
        for pair in selected.windows(2) {
            prop_assert!(pair[0].priority >= pair[1].priority);
        }
    }
}

// ── 2. Cap-tier split ────────────────────────────────────────────────

proptest! {
    #[test]
    fn midcap_target_reached_with_ample_candidates(
        scores in prop::collection::vec(arb_score(), 24),
        sectors in prop::collection::vec(arb_sector(), 24),
        large_pct in prop::sample::select(vec![50.0, 60.0, 70.0, 80.0]),
    ) {
        let mut config = StrategyConfig::default();
        config.execution.max_trades_per_run = 10;
        config.execution.min_sector_slots = 10;
        config.midcap.include = true;
        config.midcap.large_cap_percentage = large_pct;

        let signals: Vec<Signal> = scores
            .iter()
            .zip(&sectors)
            .enumerate()
            .map(|(i, (score, sector))| make_signal(i, *score, *sector, Regime::Neutral))
            .collect();
        // every other symbol is a mid-cap: 12 of each
        config.midcap.symbols = signals
            .iter()
            .step_by(2)
            .map(|s| s.symbol.clone())
            .collect();

        let target_large = (10.0 * large_pct / 100.0_f64).floor() as usize;
        let selected = balance(signals, &config);

        prop_assert_eq!(selected.len(), 10);
        let mid = selected.iter().filter(|s| s.is_midcap).count();
        prop_assert_eq!(mid, 10 - target_large);
    }
}

// ── 3. Score bounds ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn score_is_clamped(
        rows in prop::collection::vec(arb_row(), 10..30),
        market in arb_regime(),
        sector in arb_regime(),
    ) {
        let config = StrategyConfig::default();
        let b = score_breakdown(&rows, market, sector, &config.signals.regime_bonus).unwrap();
        let score = b.score();
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn too_few_rows_never_score(rows in prop::collection::vec(arb_row(), 0..10)) {
        let config = StrategyConfig::default();
        prop_assert!(
            score_breakdown(&rows, Regime::Neutral, Regime::Neutral, &config.signals.regime_bonus)
                .is_none()
        );
    }
}

// ── 4. Sizing ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn size_is_monotone_in_score(
        a in 0.0..1.0_f64,
        b in 0.0..1.0_f64,
        sector in arb_sector(),
        regime in arb_regime(),
        buying_power in 1_000.0..1_000_000.0_f64,
    ) {
        let config = StrategyConfig::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let small = position_size(&make_signal(0, lo, sector, regime), buying_power, &config);
        let large = position_size(&make_signal(0, hi, sector, regime), buying_power, &config);

        prop_assert!(small <= large);
        let limit = buying_power * config.sizing.max_buying_power_fraction + 0.005;
        prop_assert!(large <= limit);
        prop_assert!(small >= 0.0);
    }

    #[test]
    fn below_tier_two_sizes_to_zero(score in 0.0..0.8_f64, regime in arb_regime()) {
        let config = StrategyConfig::default();
        let signal = make_signal(0, score, Sector::Technology, regime);
        prop_assert_eq!(position_size(&signal, 100_000.0, &config), 0.0);
    }
}

// ── 5. Exit thresholds ───────────────────────────────────────────────

proptest! {
    #[test]
    fn higher_atr_pct_is_never_tighter(p1 in 20.0..90.0_f64, p2 in 20.0..90.0_f64) {
        let config = StrategyConfig::default();
        let series = PriceSeries::new("XOM", strong_bars("XOM")).unwrap();
        let frame = compute_indicators(&series, &IndicatorParams::default()).unwrap();
        let context = MarketContext::neutral(as_of());
        let history = PositionHistory::default();

        let threshold = |price: f64| {
            let position = Position::from_prices("XOM", 10.0, 100.0, price);
            let input = ExitInput {
                position: &position,
                frame: &frame,
                context: &context,
                sector: Sector::Energy,
                history: &history,
            };
            evaluate_exit(&input, &config).unwrap().adaptive_threshold
        };

        // a lower price means the same ATR is a larger share of it
        let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        prop_assert!(threshold(lo) <= threshold(hi));
        prop_assert!(threshold(lo) < 0.0);
    }

    #[test]
    fn trailing_level_stays_below_peak(peak in 3.0..60.0_f64) {
        let config = StrategyConfig::default();
        let level = trailing_threshold(peak, &config).unwrap();
        prop_assert!(level <= peak);
        prop_assert!(level >= 1.0);
    }
}

// ── 6. Simulation ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn seeded_runs_replay(seed in any::<u64>(), signals in arb_signals(20)) {
        let config = StrategyConfig::default();
        let first = SyntheticSimulator::with_seed(&config, seed)
            .unwrap()
            .simulate(&signals, as_of(), 100_000.0);
        let second = SyntheticSimulator::with_seed(&config, seed)
            .unwrap()
            .simulate(&signals, as_of(), 100_000.0);
        prop_assert_eq!(&first, &second);

        let metrics = SimulationMetrics::compute(&first);
        prop_assert!((0.0..=1.0).contains(&metrics.win_rate));
        prop_assert!((0.0..=1.0).contains(&metrics.max_drawdown));
        prop_assert_eq!(metrics.winners + metrics.losers, metrics.total_trades);
    }
}

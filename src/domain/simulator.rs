//! Synthetic outcome simulator.
//!
//! Given a balanced signal list, draws a win/loss outcome for each signal
//! from a regime- and score-adjusted probability, sizes it against the
//! running capital, and compounds. Used to compare configurations without a
//! broker; results are reproducible for a fixed seed.

use crate::domain::config::StrategyConfig;
use crate::domain::error::TraderError;
use crate::domain::regime::{Regime, RegimeTable};
use crate::domain::signal::{Signal, Tier};
use crate::domain::sizing::round_cents;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

const MAX_WIN_PROBABILITY: f64 = 0.95;
const SCORE_PIVOT: f64 = 0.7;
const SCORE_WEIGHT: f64 = 0.5;
const MAX_CAPITAL_FRACTION: f64 = 0.95;
const MAX_ENTRY_OFFSET_DAYS: i64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub seed: u64,
    pub base_win_rate: f64,
    /// Mean return of a winning trade, as a fraction.
    pub avg_win: f64,
    /// Mean return of a losing trade, as a fraction (negative).
    pub avg_loss: f64,
    pub noise_std: f64,
    pub win_holding_days: f64,
    pub loss_holding_days: f64,
    pub holding_std: f64,
    pub win_rate_adjustments: RegimeTable,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            seed: 42,
            base_win_rate: 0.62,
            avg_win: 0.05,
            avg_loss: -0.02,
            noise_std: 0.01,
            win_holding_days: 12.0,
            loss_holding_days: 5.0,
            holding_std: 3.0,
            win_rate_adjustments: RegimeTable::new(-0.20, -0.10, 0.0, 0.10, 0.15),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTrade {
    pub symbol: String,
    pub tier: Tier,
    pub score: f64,
    pub market_regime: Regime,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub holding_days: i64,
    /// The sampled outcome. Noise can push a loss above zero, so this
    /// and not the sign of `pnl` decides wins.
    pub won: bool,
    pub size: f64,
    /// Realised return as a fraction of `size`.
    pub return_frac: f64,
    pub pnl: f64,
    pub capital_after: f64,
}

impl SimulatedTrade {
    pub fn return_pct(&self) -> f64 {
        self.return_frac * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub trades: Vec<SimulatedTrade>,
    /// Signals not traded because their tier carries no allocation or capital ran out.
    pub skipped: usize,
}

pub trait OutcomeSimulator {
    fn simulate(&mut self, signals: &[Signal], start: NaiveDate, capital: f64) -> SimulationRun;
}

/// Win probability for a signal: base rate plus regime adjustment plus a
/// score term, clamped to `[0, 0.95]`.
pub fn win_probability(score: f64, regime: Regime, params: &SimulationParams) -> f64 {
    let p = params.base_win_rate
        + params.win_rate_adjustments.get(regime)
        + (score - SCORE_PIVOT) * SCORE_WEIGHT;
    p.clamp(0.0, MAX_WIN_PROBABILITY)
}

pub struct SyntheticSimulator {
    params: SimulationParams,
    config: StrategyConfig,
    rng: StdRng,
    noise: Normal<f64>,
    win_holding: Normal<f64>,
    loss_holding: Normal<f64>,
}

impl SyntheticSimulator {
    pub fn new(config: &StrategyConfig) -> Result<Self, TraderError> {
        Self::with_seed(config, config.simulation.seed)
    }

    pub fn with_seed(config: &StrategyConfig, seed: u64) -> Result<Self, TraderError> {
        let params = config.simulation.clone();
        let noise = normal("noise_std", 0.0, params.noise_std)?;
        let win_holding = normal("holding_std", params.win_holding_days, params.holding_std)?;
        let loss_holding = normal("holding_std", params.loss_holding_days, params.holding_std)?;
        Ok(Self {
            params,
            config: config.clone(),
            rng: StdRng::seed_from_u64(seed),
            noise,
            win_holding,
            loss_holding,
        })
    }

    fn allocation(&self, signal: &Signal, tier: Tier, capital: f64) -> f64 {
        let sizing = &self.config.sizing;
        let multiplier = match tier {
            Tier::Tier1 => sizing.tier1_multiplier,
            Tier::Tier2 => sizing.tier2_multiplier,
            Tier::BelowThreshold => sizing.below_threshold_multiplier,
        };
        let mut size = sizing.base_position_pct / 100.0 * capital * multiplier;
        if signal.is_midcap {
            size *= self.config.midcap.position_factor;
        }
        round_cents(size.min(capital * MAX_CAPITAL_FRACTION).max(0.0))
    }

    fn holding_days(&mut self, won: bool) -> i64 {
        let draw = if won {
            self.win_holding.sample(&mut self.rng)
        } else {
            self.loss_holding.sample(&mut self.rng)
        };
        (draw.round() as i64).max(1)
    }
}

fn normal(key: &str, mean: f64, std: f64) -> Result<Normal<f64>, TraderError> {
    Normal::new(mean, std).map_err(|e| TraderError::ConfigInvalid {
        section: "simulation".into(),
        key: key.into(),
        reason: e.to_string(),
    })
}

impl OutcomeSimulator for SyntheticSimulator {
    fn simulate(&mut self, signals: &[Signal], start: NaiveDate, capital: f64) -> SimulationRun {
        let mut remaining = capital;
        let mut trades = Vec::with_capacity(signals.len());
        let mut skipped = 0usize;

        for signal in signals {
            let tier = Tier::from_score(signal.score, &self.config.signals.tiers);
            let size = self.allocation(signal, tier, remaining);
            if size <= 0.0 {
                skipped += 1;
                continue;
            }

            let p = win_probability(signal.score, signal.market_regime, &self.params);
            let won = self.rng.r#gen::<f64>() < p;
            let mean = if won {
                self.params.avg_win
            } else {
                self.params.avg_loss
            };
            let return_frac = mean + self.noise.sample(&mut self.rng);
            let holding_days = self.holding_days(won);
            let entry_date =
                start + Duration::days(self.rng.gen_range(1..=MAX_ENTRY_OFFSET_DAYS));

            let pnl = round_cents(size * return_frac);
            remaining += pnl;

            tracing::debug!(
                symbol = %signal.symbol,
                tier = %tier,
                p,
                won,
                size,
                pnl,
                capital = remaining,
                "simulated trade"
            );

            trades.push(SimulatedTrade {
                symbol: signal.symbol.clone(),
                tier,
                score: signal.score,
                market_regime: signal.market_regime,
                entry_date,
                exit_date: entry_date + Duration::days(holding_days),
                holding_days,
                won,
                size,
                return_frac,
                pnl,
                capital_after: remaining,
            });
        }

        tracing::info!(
            trades = trades.len(),
            skipped,
            initial = capital,
            final_capital = remaining,
            "simulation finished"
        );

        SimulationRun {
            initial_capital: capital,
            final_capital: remaining,
            trades,
            skipped,
        }
    }
}

//! Summary statistics for a simulated run.

use crate::domain::signal::Tier;
use crate::domain::simulator::{SimulatedTrade, SimulationRun};

#[derive(Debug, Clone, PartialEq)]
pub struct TierBreakdown {
    pub tier: Tier,
    pub count: usize,
    pub win_rate: f64,
    pub avg_pl_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationMetrics {
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate: f64,
    /// Gross profit over gross loss; infinite when nothing lost.
    pub profit_factor: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub avg_holding_days: f64,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub by_tier: Vec<TierBreakdown>,
}

impl SimulationMetrics {
    pub fn compute(run: &SimulationRun) -> Self {
        let trades = &run.trades;

        let mut winners = 0usize;
        let mut losers = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut win_pct_sum = 0.0_f64;
        let mut loss_pct_sum = 0.0_f64;
        let mut holding_sum = 0i64;

        for trade in trades {
            if trade.won {
                winners += 1;
                win_pct_sum += trade.return_pct();
            } else {
                losers += 1;
                loss_pct_sum += trade.return_pct();
            }
            if trade.pnl > 0.0 {
                gross_profit += trade.pnl;
            } else {
                gross_loss += trade.pnl.abs();
            }
            holding_sum += trade.holding_days;
        }

        let total_trades = trades.len();
        let win_rate = ratio(winners as f64, total_trades as f64);

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let total_return = ratio(
            run.final_capital - run.initial_capital,
            run.initial_capital,
        );

        SimulationMetrics {
            total_trades,
            winners,
            losers,
            win_rate,
            profit_factor,
            avg_win_pct: ratio(win_pct_sum, winners as f64),
            avg_loss_pct: ratio(loss_pct_sum, losers as f64),
            avg_holding_days: ratio(holding_sum as f64, total_trades as f64),
            initial_capital: run.initial_capital,
            final_capital: run.final_capital,
            total_return,
            max_drawdown: compute_drawdown(run.initial_capital, trades),
            by_tier: tier_breakdown(trades),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Largest peak-to-trough fall of the capital path, as a fraction of the peak.
fn compute_drawdown(initial_capital: f64, trades: &[SimulatedTrade]) -> f64 {
    let mut peak = initial_capital;
    let mut max_dd = 0.0_f64;
    for trade in trades {
        let capital = trade.capital_after;
        if capital > peak {
            peak = capital;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - capital) / peak);
        }
    }
    max_dd
}

fn tier_breakdown(trades: &[SimulatedTrade]) -> Vec<TierBreakdown> {
    [Tier::Tier1, Tier::Tier2, Tier::BelowThreshold]
        .into_iter()
        .filter_map(|tier| {
            let in_tier: Vec<&SimulatedTrade> = trades.iter().filter(|t| t.tier == tier).collect();
            if in_tier.is_empty() {
                return None;
            }
            let count = in_tier.len();
            let wins = in_tier.iter().filter(|t| t.won).count();
            let pl_sum: f64 = in_tier.iter().map(|t| t.return_pct()).sum();
            Some(TierBreakdown {
                tier,
                count,
                win_rate: wins as f64 / count as f64,
                avg_pl_pct: pl_sum / count as f64,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::regime::Regime;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_trade(tier: Tier, size: f64, return_frac: f64, days: i64, capital_after: f64) -> SimulatedTrade {
        let entry_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        SimulatedTrade {
            symbol: "SYM".to_string(),
            tier,
            score: 0.9,
            market_regime: Regime::Neutral,
            entry_date,
            exit_date: entry_date + chrono::Duration::days(days),
            holding_days: days,
            won: return_frac > 0.0,
            size,
            return_frac,
            pnl: size * return_frac,
            capital_after,
        }
    }

    fn make_run(trades: Vec<SimulatedTrade>) -> SimulationRun {
        let final_capital = trades.last().map_or(10_000.0, |t| t.capital_after);
        SimulationRun {
            initial_capital: 10_000.0,
            final_capital,
            trades,
            skipped: 0,
        }
    }

    #[test]
    fn metrics_empty_run() {
        let metrics = SimulationMetrics::compute(&make_run(vec![]));
        assert_eq!(metrics.total_trades, 0);
        assert!((metrics.win_rate - 0.0).abs() < f64::EPSILON);
        assert!((metrics.profit_factor - 0.0).abs() < f64::EPSILON);
        assert!((metrics.total_return - 0.0).abs() < f64::EPSILON);
        assert!(metrics.by_tier.is_empty());
    }

    #[test]
    fn metrics_counts_and_averages() {
        let run = make_run(vec![
            make_trade(Tier::Tier1, 1000.0, 0.05, 12, 10_050.0),
            make_trade(Tier::Tier2, 1000.0, -0.02, 4, 10_030.0),
            make_trade(Tier::Tier1, 1000.0, 0.03, 10, 10_060.0),
        ]);
        let metrics = SimulationMetrics::compute(&run);
        assert_eq!(metrics.winners, 2);
        assert_eq!(metrics.losers, 1);
        assert_relative_eq!(metrics.win_rate, 2.0 / 3.0);
        assert_relative_eq!(metrics.profit_factor, 80.0 / 20.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.avg_win_pct, 4.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.avg_loss_pct, -2.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.avg_holding_days, 26.0 / 3.0);
        assert_relative_eq!(metrics.total_return, 0.006, epsilon = 1e-9);
    }

    #[test]
    fn metrics_profit_factor_without_losses() {
        let run = make_run(vec![make_trade(Tier::Tier2, 500.0, 0.04, 9, 10_020.0)]);
        assert!(SimulationMetrics::compute(&run).profit_factor.is_infinite());
    }

    #[test]
    fn metrics_count_sampled_outcome_not_pnl_sign() {
        let mut noisy_loss = make_trade(Tier::Tier1, 1000.0, 0.004, 5, 10_004.0);
        noisy_loss.won = false;
        let mut small_win = make_trade(Tier::Tier1, 1000.0, -0.001, 12, 10_003.0);
        small_win.won = true;
        let metrics = SimulationMetrics::compute(&make_run(vec![noisy_loss, small_win]));
        assert_eq!(metrics.winners, 1);
        assert_eq!(metrics.losers, 1);
        assert_relative_eq!(metrics.win_rate, 0.5);
        assert_relative_eq!(metrics.avg_win_pct, -0.1, epsilon = 1e-9);
        assert_relative_eq!(metrics.avg_loss_pct, 0.4, epsilon = 1e-9);
        assert_relative_eq!(metrics.by_tier[0].win_rate, 0.5);
    }

    #[test]
    fn metrics_max_drawdown() {
        let run = make_run(vec![
            make_trade(Tier::Tier1, 1000.0, 0.2, 5, 10_200.0),
            make_trade(Tier::Tier1, 1000.0, -0.5, 5, 9_690.0),
            make_trade(Tier::Tier1, 1000.0, 0.1, 5, 9_790.0),
        ]);
        let metrics = SimulationMetrics::compute(&run);
        assert_relative_eq!(metrics.max_drawdown, 510.0 / 10_200.0, epsilon = 1e-9);
    }

    #[test]
    fn metrics_per_tier_breakdown() {
        let run = make_run(vec![
            make_trade(Tier::Tier1, 1000.0, 0.06, 12, 10_060.0),
            make_trade(Tier::Tier1, 1000.0, -0.02, 5, 10_040.0),
            make_trade(Tier::Tier2, 500.0, 0.04, 11, 10_060.0),
        ]);
        let by_tier = SimulationMetrics::compute(&run).by_tier;
        assert_eq!(by_tier.len(), 2);
        assert_eq!(by_tier[0].tier, Tier::Tier1);
        assert_eq!(by_tier[0].count, 2);
        assert_relative_eq!(by_tier[0].win_rate, 0.5);
        assert_relative_eq!(by_tier[0].avg_pl_pct, 2.0, epsilon = 1e-9);
        assert_eq!(by_tier[1].tier, Tier::Tier2);
        assert_relative_eq!(by_tier[1].avg_pl_pct, 4.0, epsilon = 1e-9);
    }
}

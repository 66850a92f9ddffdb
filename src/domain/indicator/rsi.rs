//! RSI (Relative Strength Index).
//!
//! Average gain and average loss are simple rolling means of the last n
//! close-to-close changes.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut gains = Vec::with_capacity(bars.len());
    let mut losses = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let change = bar.close - bars[i - 1].close;
            gains.push(change.max(0.0));
            losses.push((-change).max(0.0));
        }

        let valid = period > 0 && i >= period;
        let rsi = if valid {
            let avg_gain = gains[i - period..i].iter().sum::<f64>() / period as f64;
            let avg_loss = losses[i - period..i].iter().sum::<f64>() / period as f64;
            rsi_from_averages(avg_gain, avg_loss)
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(rsi),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn rsi_warmup() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let series = calculate_rsi(&bars, 3);
        assert!(!series.values[2].valid);
        assert!(series.values[3].valid);
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let series = calculate_rsi(&bars, 3);
        assert!((series.simple_at(4).unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_flat_window_is_100_not_nan() {
        let bars = make_bars(&[5.0; 6]);
        let series = calculate_rsi(&bars, 3);
        let value = series.simple_at(5).unwrap();
        assert!(value.is_finite());
        assert!((value - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let bars = make_bars(&[5.0, 4.0, 3.0, 2.0]);
        let series = calculate_rsi(&bars, 3);
        assert!(series.simple_at(3).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_uses_rolling_window() {
        // changes: +2, -1, +1, -2 ; window 2 at i=4 covers (+1, -2)
        let bars = make_bars(&[10.0, 12.0, 11.0, 12.0, 10.0]);
        let series = calculate_rsi(&bars, 2);
        // avg_gain = 0.5, avg_loss = 1.0, RS = 0.5, RSI = 100 - 100/1.5
        let expected = 100.0 - 100.0 / 1.5;
        assert!((series.simple_at(4).unwrap() - expected).abs() < 1e-9);
    }
}

//! Simple moving averages over closes and volumes.
//!
//! SMA(n)[i] = mean(x[i-n+1..=i]). Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    rolling_series(bars, &closes, period, IndicatorType::Sma(period))
}

pub fn calculate_volume_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    rolling_series(bars, &volumes, period, IndicatorType::VolumeSma(period))
}

/// Rolling mean of `values`, `None` until `period` values are available.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Mean of the last `min(window, values.len())` values ending at `end`.
pub fn trailing_mean(values: &[f64], end: usize, window: usize) -> Option<f64> {
    if window == 0 || end >= values.len() {
        return None;
    }
    let len = window.min(end + 1);
    let slice = &values[end + 1 - len..=end];
    Some(slice.iter().sum::<f64>() / len as f64)
}

fn rolling_series(
    bars: &[OhlcvBar],
    values: &[f64],
    period: usize,
    indicator_type: IndicatorType,
) -> IndicatorSeries {
    let means = rolling_mean(values, period);
    let values = bars
        .iter()
        .zip(means)
        .map(|(bar, mean)| IndicatorPoint {
            date: bar.date,
            valid: mean.is_some(),
            value: IndicatorValue::Simple(mean.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

//! ATR (Average True Range).
//!
//! TR[0] = high - low, TR[i] = max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR(n)[i] = simple mean of TR[i-n+1..=i]. Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::sma::rolling_mean;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let means = rolling_mean(&true_ranges(bars), period);

    let values = bars
        .iter()
        .zip(means)
        .map(|(bar, atr)| IndicatorPoint {
            date: bar.date,
            valid: atr.is_some(),
            value: IndicatorValue::Simple(atr.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}

pub fn true_ranges(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

/// Latest ATR divided by the mean of the last `window` ATR values.
///
/// `None` until `window` valid ATR values exist or when that mean is zero.
pub fn atr_ratio(atr: &IndicatorSeries, window: usize) -> Option<f64> {
    let valid: Vec<f64> = atr
        .values
        .iter()
        .filter(|p| p.valid)
        .filter_map(|p| match p.value {
            IndicatorValue::Simple(v) => Some(v),
            _ => None,
        })
        .collect();
    if window == 0 || valid.len() < window {
        return None;
    }
    let recent = &valid[valid.len() - window..];
    let mean = recent.iter().sum::<f64>() / window as f64;
    let latest = *valid.last()?;
    if mean > 0.0 { Some(latest / mean) } else { None }
}

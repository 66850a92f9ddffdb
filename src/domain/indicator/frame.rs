//! Indicator frame: a price series joined with every derived column.

use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::bollinger::{calculate_bollinger, mult_to_x100};
use crate::domain::indicator::macd::{calculate_macd, macd_warmup};
use crate::domain::indicator::roc::calculate_roc;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_volume_sma;
use crate::domain::indicator::{IndicatorPoint, IndicatorValue};
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;

/// Lookback periods for the indicator engine.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std_mult: f64,
    pub atr_period: usize,
    pub volume_period: usize,
    pub momentum_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 10,
            macd_fast: 8,
            macd_slow: 17,
            macd_signal: 5,
            bb_period: 15,
            bb_std_mult: 2.0,
            atr_period: 10,
            volume_period: 10,
            momentum_period: 5,
        }
    }
}

const PRICE_CHANGE_SHORT: usize = 1;
const PRICE_CHANGE_LONG: usize = 5;

impl IndicatorParams {
    /// Index of the first row where every derived column is defined.
    pub fn warmup(&self) -> usize {
        [
            self.rsi_period,
            macd_warmup(self.macd_fast, self.macd_slow, self.macd_signal),
            self.bb_period.saturating_sub(1),
            self.atr_period.saturating_sub(1),
            self.volume_period.saturating_sub(1),
            self.momentum_period,
            PRICE_CHANGE_LONG,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Shortest series that yields at least one complete row.
    pub fn min_rows(&self) -> usize {
        self.warmup() + 1
    }
}

/// One fully-populated row of the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,
    pub sma: f64,
    pub std: f64,
    pub upper_band: f64,
    pub lower_band: f64,
    pub atr: f64,
    pub volume_sma: f64,
    pub volume_ratio: f64,
    /// close / close[n bars ago] - 1
    pub momentum: f64,
    pub price_change_1d: f64,
    pub price_change_5d: f64,
}

impl IndicatorRow {
    /// ATR as a percentage of close.
    pub fn atr_pct(&self) -> f64 {
        self.atr / self.close * 100.0
    }

    /// Where close sits inside the bands, 0 at the lower band and 1 at the upper.
    pub fn band_position(&self) -> Option<f64> {
        let range = self.upper_band - self.lower_band;
        (range > 0.0).then(|| (self.close - self.lower_band) / range)
    }

    /// Band width relative to the middle band.
    pub fn band_width(&self) -> f64 {
        if self.sma > 0.0 {
            (self.upper_band - self.lower_band) / self.sma
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    series: PriceSeries,
    params: IndicatorParams,
    rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    pub fn symbol(&self) -> &str {
        self.series.symbol()
    }

    /// The unannotated series the frame was computed from.
    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }
}

/// Computes every indicator column for `series`.
///
/// Returns `None` when the series is shorter than [`IndicatorParams::min_rows`].
pub fn compute_indicators(series: &PriceSeries, params: &IndicatorParams) -> Option<IndicatorFrame> {
    if series.len() < params.min_rows() {
        return None;
    }

    let bars = series.bars();
    let rsi = calculate_rsi(bars, params.rsi_period);
    let macd = calculate_macd(bars, params.macd_fast, params.macd_slow, params.macd_signal);
    let bollinger = calculate_bollinger(bars, params.bb_period, mult_to_x100(params.bb_std_mult));
    let atr = calculate_atr(bars, params.atr_period);
    let volume_sma = calculate_volume_sma(bars, params.volume_period);
    let momentum = calculate_roc(bars, params.momentum_period);
    let change_1d = calculate_roc(bars, PRICE_CHANGE_SHORT);
    let change_5d = calculate_roc(bars, PRICE_CHANGE_LONG);

    let rows: Vec<IndicatorRow> = bars
        .iter()
        .enumerate()
        .filter_map(|(i, bar)| {
            let (macd_line, macd_signal, macd_hist) = match macd.values[i] {
                IndicatorPoint {
                    valid: true,
                    value:
                        IndicatorValue::Macd {
                            line,
                            signal,
                            histogram,
                        },
                    ..
                } => (line, signal, histogram),
                _ => return None,
            };
            let (upper, middle, lower, stddev) = match bollinger.values[i] {
                IndicatorPoint {
                    valid: true,
                    value:
                        IndicatorValue::Bollinger {
                            upper,
                            middle,
                            lower,
                            stddev,
                        },
                    ..
                } => (upper, middle, lower, stddev),
                _ => return None,
            };
            let volume_sma = volume_sma.simple_at(i)?;
            let volume_ratio = if volume_sma > 0.0 {
                bar.volume / volume_sma
            } else {
                1.0
            };

            Some(IndicatorRow {
                date: bar.date,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                rsi: rsi.simple_at(i)?,
                macd: macd_line,
                macd_signal,
                macd_hist,
                sma: middle,
                std: stddev,
                upper_band: upper,
                lower_band: lower,
                atr: atr.simple_at(i)?,
                volume_sma,
                volume_ratio,
                momentum: momentum.simple_at(i)? / 100.0,
                price_change_1d: change_1d.simple_at(i)?,
                price_change_5d: change_5d.simple_at(i)?,
            })
        })
        .collect();

    if rows.is_empty() {
        return None;
    }

    Some(IndicatorFrame {
        series: series.clone(),
        params: params.clone(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::Duration;

    fn wave_series(n: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1;
                OhlcvBar {
                    symbol: "WAVE".into(),
                    date: start + Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 100_000.0 + (i % 7) as f64 * 10_000.0,
                }
            })
            .collect();
        PriceSeries::new("WAVE", bars).unwrap()
    }

    #[test]
    fn default_min_rows_is_longest_lookback_plus_one() {
        let params = IndicatorParams::default();
        // MACD 8/17/5 warms up for 16 + 4 bars
        assert_eq!(params.warmup(), 20);
        assert_eq!(params.min_rows(), 21);
    }

    #[test]
    fn short_series_returns_none() {
        let params = IndicatorParams::default();
        assert!(compute_indicators(&wave_series(20), &params).is_none());
        assert!(compute_indicators(&wave_series(0), &params).is_none());
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let params = IndicatorParams::default();
        let frame = compute_indicators(&wave_series(40), &params).unwrap();
        assert_eq!(frame.len(), 40 - params.warmup());
        assert_eq!(frame.rows()[0].date, frame.series().bars()[params.warmup()].date);
    }

    #[test]
    fn rows_contain_no_nan() {
        let frame = compute_indicators(&wave_series(60), &IndicatorParams::default()).unwrap();
        for row in frame.rows() {
            for value in [
                row.rsi,
                row.macd,
                row.macd_signal,
                row.macd_hist,
                row.sma,
                row.std,
                row.upper_band,
                row.lower_band,
                row.atr,
                row.volume_ratio,
                row.momentum,
                row.price_change_1d,
                row.price_change_5d,
            ] {
                assert!(value.is_finite());
            }
        }
    }

    #[test]
    fn recomputing_from_frame_is_idempotent() {
        let params = IndicatorParams::default();
        let frame = compute_indicators(&wave_series(50), &params).unwrap();
        let again = compute_indicators(frame.series(), frame.params()).unwrap();
        assert_eq!(frame, again);
    }

    #[test]
    fn no_look_ahead() {
        let params = IndicatorParams::default();
        let full = compute_indicators(&wave_series(50), &params).unwrap();
        let bars = full.series().bars()[..40].to_vec();
        let prefix = compute_indicators(&PriceSeries::new("WAVE", bars).unwrap(), &params).unwrap();
        assert_eq!(prefix.rows(), &full.rows()[..prefix.len()]);
    }

    #[test]
    fn zero_volume_average_gives_unit_ratio() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..30)
            .map(|i| OhlcvBar {
                symbol: "ZV".into(),
                date: start + Duration::days(i),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0 + (i % 3) as f64,
                volume: 0.0,
            })
            .collect();
        let series = PriceSeries::new("ZV", bars).unwrap();
        let frame = compute_indicators(&series, &IndicatorParams::default()).unwrap();
        assert!(frame.rows().iter().all(|r| (r.volume_ratio - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn band_position_and_width() {
        let frame = compute_indicators(&wave_series(40), &IndicatorParams::default()).unwrap();
        let mut row = frame.latest().unwrap().clone();
        row.lower_band = 90.0;
        row.upper_band = 110.0;
        row.sma = 100.0;
        row.close = 94.0;
        assert!((row.band_position().unwrap() - 0.2).abs() < 1e-12);
        assert!((row.band_width() - 0.2).abs() < 1e-12);
    }
}

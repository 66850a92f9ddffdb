//! Market and sector regime classification.
//!
//! The market classifier sums seven technical cues over the benchmark series
//! plus the breadth of the sector proxies. The sector classifier uses a reduced
//! two-cue version over each proxy ETF.

use crate::domain::indicator::atr::{atr_ratio, calculate_atr};
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::{calculate_sma, trailing_mean};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::sector::Sector;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fewer sessions than this yields a degraded NEUTRAL reading.
pub const MIN_REGIME_SESSIONS: usize = 20;

const REGIME_RSI_PERIOD: usize = 14;
const REGIME_ATR_PERIOD: usize = 10;
const ATR_RATIO_WINDOW: usize = 20;
const VOLUME_SESSIONS: usize = 5;
const VOLUME_SKEW: f64 = 1.5;
const CROSSOVER_SESSIONS: usize = 3;

/// (sessions, percent cutoff) pairs for the multi-horizon return cue.
const RETURN_CUTOFFS: [(usize, f64); 5] = [(1, 1.5), (3, 2.5), (5, 3.5), (10, 5.0), (20, 8.0)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Regime {
    StrongBearish,
    Bearish,
    Neutral,
    Bullish,
    StrongBullish,
}

impl Regime {
    pub const ALL: [Regime; 5] = [
        Regime::StrongBearish,
        Regime::Bearish,
        Regime::Neutral,
        Regime::Bullish,
        Regime::StrongBullish,
    ];

    /// >=7 STRONG_BULLISH, >=3 BULLISH, >-3 NEUTRAL, >-7 BEARISH, else STRONG_BEARISH.
    pub fn from_market_score(score: f64) -> Self {
        if score >= 7.0 {
            Regime::StrongBullish
        } else if score >= 3.0 {
            Regime::Bullish
        } else if score > -3.0 {
            Regime::Neutral
        } else if score > -7.0 {
            Regime::Bearish
        } else {
            Regime::StrongBearish
        }
    }

    /// >=3 STRONG_BULLISH, >0 BULLISH, 0 NEUTRAL, >-3 BEARISH, else STRONG_BEARISH.
    pub fn from_sector_score(score: i32) -> Self {
        match score {
            s if s >= 3 => Regime::StrongBullish,
            s if s > 0 => Regime::Bullish,
            0 => Regime::Neutral,
            s if s > -3 => Regime::Bearish,
            _ => Regime::StrongBearish,
        }
    }

    pub fn is_bullish(self) -> bool {
        matches!(self, Regime::Bullish | Regime::StrongBullish)
    }

    pub fn is_bearish(self) -> bool {
        matches!(self, Regime::Bearish | Regime::StrongBearish)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Regime::StrongBearish => "STRONG_BEARISH",
            Regime::Bearish => "BEARISH",
            Regime::Neutral => "NEUTRAL",
            Regime::Bullish => "BULLISH",
            Regime::StrongBullish => "STRONG_BULLISH",
        }
    }

    /// Lower-case key used in configuration, e.g. `strong_bullish`.
    pub fn key(self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase().replace([' ', '-'], "_");
        Regime::ALL
            .into_iter()
            .find(|r| r.as_str() == upper)
            .ok_or_else(|| format!("unknown regime '{}'", s))
    }
}

/// A value per regime label, used for the multiplier and bonus tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeTable {
    pub strong_bearish: f64,
    pub bearish: f64,
    pub neutral: f64,
    pub bullish: f64,
    pub strong_bullish: f64,
}

impl RegimeTable {
    pub const fn new(
        strong_bearish: f64,
        bearish: f64,
        neutral: f64,
        bullish: f64,
        strong_bullish: f64,
    ) -> Self {
        Self {
            strong_bearish,
            bearish,
            neutral,
            bullish,
            strong_bullish,
        }
    }

    pub fn get(&self, regime: Regime) -> f64 {
        match regime {
            Regime::StrongBearish => self.strong_bearish,
            Regime::Bearish => self.bearish,
            Regime::Neutral => self.neutral,
            Regime::Bullish => self.bullish,
            Regime::StrongBullish => self.strong_bullish,
        }
    }

    pub fn set(&mut self, regime: Regime, value: f64) {
        match regime {
            Regime::StrongBearish => self.strong_bearish = value,
            Regime::Bearish => self.bearish = value,
            Regime::Neutral => self.neutral = value,
            Regime::Bullish => self.bullish = value,
            Regime::StrongBullish => self.strong_bullish = value,
        }
    }
}

/// A classification result. `degraded` marks a NEUTRAL produced for lack of history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeReading {
    pub regime: Regime,
    pub score: f64,
    pub degraded: bool,
}

impl RegimeReading {
    pub fn neutral_degraded() -> Self {
        Self {
            regime: Regime::Neutral,
            score: 0.0,
            degraded: true,
        }
    }
}

/// Readings for every sector proxy classified this cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorRegimes {
    readings: BTreeMap<Sector, RegimeReading>,
}

impl SectorRegimes {
    pub fn insert(&mut self, sector: Sector, reading: RegimeReading) {
        self.readings.insert(sector, reading);
    }

    /// Regime for `sector`, NEUTRAL when the sector was not classified.
    pub fn regime_of(&self, sector: Sector) -> Regime {
        self.readings
            .get(&sector)
            .map(|r| r.regime)
            .unwrap_or(Regime::Neutral)
    }

    pub fn get(&self, sector: Sector) -> Option<&RegimeReading> {
        self.readings.get(&sector)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Sector, &RegimeReading)> {
        self.readings.iter()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    fn count(&self, pred: impl Fn(Regime) -> bool) -> usize {
        self.readings.values().filter(|r| pred(r.regime)).count()
    }
}

/// Per-cue contributions to the market score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarketCues {
    pub sma_stack: f64,
    pub returns: f64,
    pub volume: f64,
    pub volatility: f64,
    pub rsi: f64,
    pub breadth: f64,
    pub crossovers: f64,
}

impl MarketCues {
    pub fn total(&self) -> f64 {
        self.sma_stack
            + self.returns
            + self.volume
            + self.volatility
            + self.rsi
            + self.breadth
            + self.crossovers
    }
}

pub fn classify_market(series: &PriceSeries, sectors: &SectorRegimes) -> RegimeReading {
    match market_cues(series, sectors) {
        Some(cues) => {
            let score = cues.total();
            tracing::debug!(symbol = series.symbol(), ?cues, score, "market regime cues");
            RegimeReading {
                regime: Regime::from_market_score(score),
                score,
                degraded: false,
            }
        }
        None => {
            tracing::warn!(
                symbol = series.symbol(),
                sessions = series.len(),
                minimum = MIN_REGIME_SESSIONS,
                "insufficient history for market regime, using NEUTRAL"
            );
            RegimeReading::neutral_degraded()
        }
    }
}

pub fn classify_sector(series: &PriceSeries) -> RegimeReading {
    match sector_score(series) {
        Some(score) => RegimeReading {
            regime: Regime::from_sector_score(score),
            score: score as f64,
            degraded: false,
        },
        None => {
            tracing::warn!(
                symbol = series.symbol(),
                sessions = series.len(),
                minimum = MIN_REGIME_SESSIONS,
                "insufficient history for sector regime, using NEUTRAL"
            );
            RegimeReading::neutral_degraded()
        }
    }
}

/// Computes every market cue, `None` with fewer than [`MIN_REGIME_SESSIONS`] bars.
pub fn market_cues(series: &PriceSeries, sectors: &SectorRegimes) -> Option<MarketCues> {
    let n = series.len();
    if n < MIN_REGIME_SESSIONS {
        return None;
    }
    let bars = series.bars();
    let closes = series.closes();
    let last = n - 1;
    let close = closes[last];

    let sma5 = calculate_sma(bars, 5);
    let sma10 = calculate_sma(bars, 10);
    let sma20 = calculate_sma(bars, 20);
    let s5 = sma5.simple_at(last)?;
    let s10 = sma10.simple_at(last)?;
    let s20 = sma20.simple_at(last)?;
    let s50 = trailing_mean(&closes, last, 50)?;

    let mut cues = MarketCues::default();

    cues.sma_stack = if close > s5 && s5 > s10 && s10 > s20 && s20 > s50 {
        3.0
    } else if close > s5 && s5 > s10 && s10 > s20 {
        2.0
    } else if close > s5 && s5 > s20 {
        1.0
    } else if close < s5 && s5 < s10 && s10 < s20 && s20 < s50 {
        -3.0
    } else if close < s5 && s5 < s10 && s10 < s20 {
        -2.0
    } else if close < s5 && s5 < s20 {
        -1.0
    } else {
        0.0
    };

    for (sessions, cutoff) in RETURN_CUTOFFS {
        if let Some(change) = series.pct_change(sessions) {
            if change > cutoff {
                cues.returns += 1.0;
            } else if change < -cutoff {
                cues.returns -= 1.0;
            }
        }
    }

    let (mut up, mut down) = (Vec::new(), Vec::new());
    for i in n - VOLUME_SESSIONS..n {
        if closes[i] > closes[i - 1] {
            up.push(bars[i].volume);
        } else {
            down.push(bars[i].volume);
        }
    }
    if !up.is_empty() && !down.is_empty() {
        let up_avg = up.iter().sum::<f64>() / up.len() as f64;
        let down_avg = down.iter().sum::<f64>() / down.len() as f64;
        if up_avg > down_avg * VOLUME_SKEW {
            cues.volume = 1.0;
        } else if down_avg > up_avg * VOLUME_SKEW {
            cues.volume = -1.0;
        }
    }

    let change_5d = series.pct_change(5).unwrap_or(0.0);
    if let Some(ratio) = atr_ratio(&calculate_atr(bars, REGIME_ATR_PERIOD), ATR_RATIO_WINDOW) {
        if ratio > 1.5 && change_5d < 0.0 {
            cues.volatility = -1.0;
        } else if ratio < 0.7 && change_5d > 0.0 {
            cues.volatility = 1.0;
        }
    }

    if let Some(rsi) = calculate_rsi(bars, REGIME_RSI_PERIOD).latest_simple() {
        cues.rsi = if rsi > 70.0 {
            -1.0
        } else if rsi < 30.0 {
            1.0
        } else if rsi > 60.0 && change_5d > 0.0 {
            1.0
        } else if rsi < 40.0 && change_5d < 0.0 {
            -1.0
        } else {
            0.0
        };
    }

    cues.breadth = sector_breadth(sectors);

    for i in n - CROSSOVER_SESSIONS..n {
        if let (Some(p5), Some(p20), Some(c5), Some(c20)) =
            (sma5.simple_at(i - 1), sma20.simple_at(i - 1), sma5.simple_at(i), sma20.simple_at(i))
        {
            if p5 <= p20 && c5 > c20 {
                cues.crossovers += 2.0;
            } else if p5 >= p20 && c5 < c20 {
                cues.crossovers -= 2.0;
            }
        }
    }

    Some(cues)
}

/// Breadth of the sector proxies: +-2 at 8 sectors, +-1 at 6, +-0.5 per STRONG sector.
pub fn sector_breadth(sectors: &SectorRegimes) -> f64 {
    let bullish = sectors.count(Regime::is_bullish);
    let bearish = sectors.count(Regime::is_bearish);
    let mut score = if bullish >= 8 {
        2.0
    } else if bullish >= 6 {
        1.0
    } else if bearish >= 8 {
        -2.0
    } else if bearish >= 6 {
        -1.0
    } else {
        0.0
    };
    score += 0.5 * sectors.count(|r| r == Regime::StrongBullish) as f64;
    score -= 0.5 * sectors.count(|r| r == Regime::StrongBearish) as f64;
    score
}

/// Two-cue proxy score, `None` with fewer than [`MIN_REGIME_SESSIONS`] bars.
pub fn sector_score(series: &PriceSeries) -> Option<i32> {
    let n = series.len();
    if n < MIN_REGIME_SESSIONS {
        return None;
    }
    let closes = series.closes();
    let last = n - 1;
    let close = closes[last];
    let s5 = trailing_mean(&closes, last, 5)?;
    let s20 = trailing_mean(&closes, last, 20)?;

    let mut score = if close > s5 && s5 > s20 {
        2
    } else if close > s5 {
        1
    } else if close < s5 && s5 < s20 {
        -2
    } else if close < s5 {
        -1
    } else {
        0
    };

    let change_5d = series.pct_change(5)?;
    score += if change_5d > 5.0 {
        2
    } else if change_5d > 2.0 {
        1
    } else if change_5d < -5.0 {
        -2
    } else if change_5d < -2.0 {
        -1
    } else {
        0
    };

    Some(score)
}

//! Per-cycle regime cache.
//!
//! Built once at the start of a cycle and shared read-only by scoring,
//! sizing and the exit engine. Fetch failures degrade the affected reading
//! to NEUTRAL rather than failing the cycle.

use crate::domain::config::StrategyConfig;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::regime::{
    Regime, RegimeReading, SectorRegimes, classify_market, classify_sector,
};
use crate::domain::sector::Sector;
use crate::domain::universe::fetch_series;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fmt;

const VOLATILITY_ATR_PERIOD: usize = 10;
const HIGH_VOLATILITY_PCT: f64 = 2.0;
const LOW_VOLATILITY_PCT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketVolatility {
    Low,
    Normal,
    High,
}

impl MarketVolatility {
    /// Benchmark ATR as a percentage of close: above 2 is HIGH, below 1 is LOW.
    pub fn from_atr_pct(atr_pct: f64) -> Self {
        if atr_pct > HIGH_VOLATILITY_PCT {
            MarketVolatility::High
        } else if atr_pct < LOW_VOLATILITY_PCT {
            MarketVolatility::Low
        } else {
            MarketVolatility::Normal
        }
    }

    /// Classification of the latest bar of `series`, NORMAL when ATR is not yet defined.
    pub fn of_series(series: &PriceSeries) -> Self {
        let atr = calculate_atr(series.bars(), VOLATILITY_ATR_PERIOD).latest_simple();
        match (atr, series.last()) {
            (Some(atr), Some(bar)) => Self::from_atr_pct(atr / bar.close * 100.0),
            _ => MarketVolatility::Normal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarketVolatility::Low => "LOW",
            MarketVolatility::Normal => "NORMAL",
            MarketVolatility::High => "HIGH",
        }
    }
}

impl fmt::Display for MarketVolatility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketContext {
    pub as_of: NaiveDate,
    pub market: RegimeReading,
    pub sectors: SectorRegimes,
    pub volatility: MarketVolatility,
}

impl MarketContext {
    /// All-NEUTRAL context with normal volatility.
    pub fn neutral(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            market: forced_neutral(),
            sectors: Sector::TRADED
                .into_iter()
                .map(|s| (s, forced_neutral()))
                .fold(SectorRegimes::default(), |mut acc, (s, r)| {
                    acc.insert(s, r);
                    acc
                }),
            volatility: MarketVolatility::Normal,
        }
    }

    /// Classifies every sector proxy and then the benchmark.
    pub fn build(data_port: &dyn DataPort, config: &StrategyConfig, as_of: NaiveDate) -> Self {
        let mut sectors = SectorRegimes::default();
        for sector in Sector::TRADED {
            let Some(proxy) = sector.proxy_etf() else {
                continue;
            };
            let reading = if !config.regime.sector_performance_enabled {
                forced_neutral()
            } else {
                match fetch_series(data_port, proxy, &config.data, as_of) {
                    Ok(series) => classify_sector(&series),
                    Err(e) => {
                        tracing::warn!(sector = %sector, proxy, error = %e, "sector proxy unavailable, using NEUTRAL");
                        RegimeReading::neutral_degraded()
                    }
                }
            };
            sectors.insert(sector, reading);
        }

        let benchmark = &config.data.benchmark;
        let (market, volatility) = match fetch_series(data_port, benchmark, &config.data, as_of) {
            Ok(series) => {
                let market = if config.regime.market_regime_enabled {
                    classify_market(&series, &sectors)
                } else {
                    forced_neutral()
                };
                (market, MarketVolatility::of_series(&series))
            }
            Err(e) => {
                tracing::warn!(benchmark = %benchmark, error = %e, "benchmark unavailable, using NEUTRAL");
                let market = if config.regime.market_regime_enabled {
                    RegimeReading::neutral_degraded()
                } else {
                    forced_neutral()
                };
                (market, MarketVolatility::Normal)
            }
        };

        tracing::info!(
            market = %market.regime,
            score = market.score,
            degraded = market.degraded,
            volatility = %volatility,
            "market context built"
        );

        Self {
            as_of,
            market,
            sectors,
            volatility,
        }
    }

    pub fn market_regime(&self) -> Regime {
        self.market.regime
    }

    pub fn sector_regime(&self, sector: Sector) -> Regime {
        self.sectors.regime_of(sector)
    }
}

fn forced_neutral() -> RegimeReading {
    RegimeReading {
        regime: Regime::Neutral,
        score: 0.0,
        degraded: false,
    }
}

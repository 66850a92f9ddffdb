//! Strategy configuration.
//!
//! [`StrategyConfig`] is built once from a [`ConfigPort`] and passed by
//! reference into every component. Missing keys fall back to the defaults
//! below; values that are present but malformed are rejected.

use crate::domain::error::TraderError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::regime::{Regime, RegimeTable};
use crate::domain::retry::RetryPolicy;
use crate::domain::sector::{Sector, SectorMap, SectorWeights};
use crate::domain::signal::TierThresholds;
use crate::domain::simulator::SimulationParams;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::{ConfigPort, parse_bool};
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub dir: Option<PathBuf>,
    /// Calendar days of history requested per symbol.
    pub history_days: i64,
    pub benchmark: String,
    pub retry: RetryPolicy,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: None,
            history_days: 120,
            benchmark: "SPY".into(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeConfig {
    pub market_regime_enabled: bool,
    pub sector_performance_enabled: bool,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            market_regime_enabled: true,
            sector_performance_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub long_signal_threshold: f64,
    pub min_liquidity: f64,
    pub tiers: TierThresholds,
    /// Scales `long_signal_threshold` by market regime.
    pub threshold_multipliers: RegimeTable,
    /// Added to the score once for the market regime and once for the sector regime.
    pub regime_bonus: RegimeTable,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            long_signal_threshold: 0.5,
            min_liquidity: 1_000_000.0,
            tiers: TierThresholds::default(),
            threshold_multipliers: RegimeTable::new(1.2, 1.1, 1.0, 0.95, 0.9),
            regime_bonus: RegimeTable::new(-0.2, -0.1, 0.0, 0.1, 0.15),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizingConfig {
    pub initial_capital: f64,
    pub base_position_pct: f64,
    pub tier1_multiplier: f64,
    pub tier2_multiplier: f64,
    pub below_threshold_multiplier: f64,
    pub long_multiplier: f64,
    pub max_buying_power_fraction: f64,
    pub regime_multipliers: RegimeTable,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            base_position_pct: 5.0,
            tier1_multiplier: 3.0,
            tier2_multiplier: 1.5,
            below_threshold_multiplier: 0.0,
            long_multiplier: 3.0,
            max_buying_power_fraction: 0.95,
            regime_multipliers: RegimeTable::new(0.5, 0.7, 1.0, 1.15, 1.3),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MidcapConfig {
    pub include: bool,
    pub symbols: HashSet<String>,
    pub large_cap_percentage: f64,
    pub position_factor: f64,
}

impl Default for MidcapConfig {
    fn default() -> Self {
        Self {
            include: false,
            symbols: HashSet::new(),
            large_cap_percentage: 70.0,
            position_factor: 0.8,
        }
    }
}

impl MidcapConfig {
    pub fn is_midcap(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn midcap_percentage(&self) -> f64 {
        100.0 - self.large_cap_percentage
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub max_trades_per_run: usize,
    pub max_capital_per_direction: f64,
    pub sector_cap_fraction: f64,
    pub min_sector_slots: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_trades_per_run: 40,
            max_capital_per_direction: 50_000.0,
            sector_cap_fraction: 0.2,
            min_sector_slots: 3,
        }
    }
}

impl ExecutionConfig {
    /// Slots any one sector may hold: max(min_sector_slots, floor(fraction x trade cap)).
    pub fn sector_cap(&self) -> usize {
        let share = (self.max_trades_per_run as f64 * self.sector_cap_fraction).floor() as usize;
        self.min_sector_slots.max(share)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveStopConfig {
    pub enabled: bool,
    pub volatility_scaling: bool,
    pub market_regime_scaling: bool,
    pub sector_regime_scaling: bool,
    pub signal_quality_scaling: bool,
    pub time_scaling: bool,
}

impl Default for AdaptiveStopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volatility_scaling: true,
            market_regime_scaling: true,
            sector_regime_scaling: true,
            signal_quality_scaling: true,
            time_scaling: true,
        }
    }
}

/// Once profit reaches `threshold_pct`, keep at least `lock_in_pct` or
/// `retain` of the peak profit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitTier {
    pub threshold_pct: f64,
    pub lock_in_pct: f64,
    pub retain: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrailingStopConfig {
    pub enabled: bool,
    /// Ordered from highest threshold to lowest.
    pub tiers: Vec<ProfitTier>,
}

impl Default for TrailingStopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tiers: vec![
                ProfitTier {
                    threshold_pct: 10.0,
                    lock_in_pct: 7.0,
                    retain: 0.7,
                },
                ProfitTier {
                    threshold_pct: 5.0,
                    lock_in_pct: 3.0,
                    retain: 0.6,
                },
                ProfitTier {
                    threshold_pct: 3.0,
                    lock_in_pct: 1.0,
                    retain: 0.5,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopLossConfig {
    pub enabled: bool,
    /// Percentage loss that closes a position before adjustments, e.g. -2.0.
    pub base_threshold_pct: f64,
    pub adaptive: AdaptiveStopConfig,
    pub trailing: TrailingStopConfig,
    /// Used for both the market and the sector regime factor.
    pub regime_factors: RegimeTable,
}

impl Default for StopLossConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_threshold_pct: -2.0,
            adaptive: AdaptiveStopConfig::default(),
            trailing: TrailingStopConfig::default(),
            regime_factors: RegimeTable::new(0.7, 0.8, 1.0, 1.1, 1.2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "full" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Csv,
    Sqlite,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(StoreKind::Csv),
            "sqlite" => Ok(StoreKind::Sqlite),
            other => Err(format!("unknown store kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Csv,
            dir: PathBuf::from("results"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyConfig {
    pub data: DataConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub universe: Vec<String>,
    pub regime: RegimeConfig,
    pub indicators: IndicatorParams,
    pub signals: SignalConfig,
    pub sizing: SizingConfig,
    pub sector_weights: SectorWeights,
    pub sector_overrides: Vec<(String, Sector)>,
    pub midcap: MidcapConfig,
    pub execution: ExecutionConfig,
    pub stop_loss: StopLossConfig,
    pub simulation: SimulationParams,
}

impl StrategyConfig {
    /// Reads every section, filling gaps with defaults and logging one warning
    /// that lists the keys that were absent.
    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, TraderError> {
        let mut r = Reader::new(port);
        let d = StrategyConfig::default();

        let data = DataConfig {
            dir: r.string("data", "dir").map(PathBuf::from),
            history_days: r.parse("data", "history_days", d.data.history_days)?,
            benchmark: r
                .string("data", "benchmark")
                .map(|s| s.trim().to_uppercase())
                .unwrap_or(d.data.benchmark),
            retry: RetryPolicy {
                max_attempts: r.parse("data", "retry_attempts", d.data.retry.max_attempts)?,
                delay: Duration::from_millis(r.parse(
                    "data",
                    "retry_delay_ms",
                    d.data.retry.delay.as_millis() as u64,
                )?),
            },
        };

        let store = StoreConfig {
            kind: r.parse("store", "kind", d.store.kind)?,
            dir: r
                .string("store", "dir")
                .map(PathBuf::from)
                .unwrap_or(d.store.dir),
        };

        let logging = LoggingConfig {
            level: r.string("logging", "level").unwrap_or(d.logging.level),
            format: r.parse("logging", "format", d.logging.format)?,
        };

        let universe = match r.string("universe", "symbols") {
            Some(list) => parse_symbols(&list).map_err(|e| invalid("universe", "symbols", e))?,
            None => Vec::new(),
        };

        let regime = RegimeConfig {
            market_regime_enabled: r.bool(
                "regime",
                "market_regime_enabled",
                d.regime.market_regime_enabled,
            )?,
            sector_performance_enabled: r.bool(
                "regime",
                "sector_performance_enabled",
                d.regime.sector_performance_enabled,
            )?,
        };

        let di = &d.indicators;
        let indicators = IndicatorParams {
            rsi_period: r.parse("indicators", "rsi_period", di.rsi_period)?,
            macd_fast: r.parse("indicators", "macd_fast", di.macd_fast)?,
            macd_slow: r.parse("indicators", "macd_slow", di.macd_slow)?,
            macd_signal: r.parse("indicators", "macd_signal", di.macd_signal)?,
            bb_period: r.parse("indicators", "bb_period", di.bb_period)?,
            bb_std_mult: r.parse("indicators", "bb_std", di.bb_std_mult)?,
            atr_period: r.parse("indicators", "atr_period", di.atr_period)?,
            volume_period: r.parse("indicators", "volume_period", di.volume_period)?,
            momentum_period: r.parse("indicators", "momentum_period", di.momentum_period)?,
        };

        let ds = &d.signals;
        let signals = SignalConfig {
            long_signal_threshold: r.parse(
                "signals",
                "long_signal_threshold",
                ds.long_signal_threshold,
            )?,
            min_liquidity: r.parse("signals", "min_liquidity", ds.min_liquidity)?,
            tiers: TierThresholds {
                tier1_min: r.parse("signals", "tier1_min", ds.tiers.tier1_min)?,
                tier2_min: r.parse("signals", "tier2_min", ds.tiers.tier2_min)?,
            },
            threshold_multipliers: r.regime_table(
                "signals",
                "threshold",
                ds.threshold_multipliers,
            )?,
            regime_bonus: r.regime_table("signals", "bonus", ds.regime_bonus)?,
        };

        let dz = &d.sizing;
        let sizing = SizingConfig {
            initial_capital: r.parse("sizing", "initial_capital", dz.initial_capital)?,
            base_position_pct: r.parse("sizing", "base_position_pct", dz.base_position_pct)?,
            tier1_multiplier: r.parse("sizing", "tier1_multiplier", dz.tier1_multiplier)?,
            tier2_multiplier: r.parse("sizing", "tier2_multiplier", dz.tier2_multiplier)?,
            below_threshold_multiplier: r.parse(
                "sizing",
                "below_threshold_multiplier",
                dz.below_threshold_multiplier,
            )?,
            long_multiplier: r.parse("sizing", "long_multiplier", dz.long_multiplier)?,
            max_buying_power_fraction: r.parse(
                "sizing",
                "max_buying_power_fraction",
                dz.max_buying_power_fraction,
            )?,
            regime_multipliers: r.regime_table("sizing", "regime", dz.regime_multipliers)?,
        };

        let mut sector_weights = SectorWeights::default();
        let mut sector_overrides = Vec::new();
        for sector in Sector::TRADED.into_iter().chain([Sector::Unknown]) {
            if let Some(weight) = r.optional::<f64>("sector_weights", &sector.key())? {
                sector_weights = sector_weights.with_weight(sector, weight);
            }
            if let Some(list) = r.port.get_string("sector_map", &sector.key()) {
                let symbols = parse_symbols(&list)
                    .map_err(|e| invalid("sector_map", &sector.key(), e))?;
                sector_overrides.extend(symbols.into_iter().map(|s| (s, sector)));
            }
        }

        let dm = &d.midcap;
        let midcap = MidcapConfig {
            include: r.bool("midcap", "include", dm.include)?,
            symbols: match r.string("midcap", "symbols") {
                Some(list) => parse_symbols(&list)
                    .map_err(|e| invalid("midcap", "symbols", e))?
                    .into_iter()
                    .collect(),
                None => HashSet::new(),
            },
            large_cap_percentage: r.parse(
                "midcap",
                "large_cap_percentage",
                dm.large_cap_percentage,
            )?,
            position_factor: r.parse("midcap", "position_factor", dm.position_factor)?,
        };

        let de = &d.execution;
        let execution = ExecutionConfig {
            max_trades_per_run: r.parse("execution", "max_trades_per_run", de.max_trades_per_run)?,
            max_capital_per_direction: r.parse(
                "execution",
                "max_capital_per_direction",
                de.max_capital_per_direction,
            )?,
            sector_cap_fraction: r.parse(
                "execution",
                "sector_cap_fraction",
                de.sector_cap_fraction,
            )?,
            min_sector_slots: r.parse("execution", "min_sector_slots", de.min_sector_slots)?,
        };

        let dl = &d.stop_loss;
        let da = &dl.adaptive;
        let adaptive = AdaptiveStopConfig {
            enabled: r.bool("stop_loss.adaptive", "enabled", da.enabled)?,
            volatility_scaling: r.bool(
                "stop_loss.adaptive",
                "volatility_scaling",
                da.volatility_scaling,
            )?,
            market_regime_scaling: r.bool(
                "stop_loss.adaptive",
                "market_regime_scaling",
                da.market_regime_scaling,
            )?,
            sector_regime_scaling: r.bool(
                "stop_loss.adaptive",
                "sector_regime_scaling",
                da.sector_regime_scaling,
            )?,
            signal_quality_scaling: r.bool(
                "stop_loss.adaptive",
                "signal_quality_scaling",
                da.signal_quality_scaling,
            )?,
            time_scaling: r.bool("stop_loss.adaptive", "time_scaling", da.time_scaling)?,
        };
        let mut tiers = Vec::with_capacity(dl.trailing.tiers.len());
        for (i, default) in dl.trailing.tiers.iter().enumerate() {
            let n = i + 1;
            tiers.push(ProfitTier {
                threshold_pct: r.parse(
                    "stop_loss.trailing",
                    &format!("tier{n}_threshold"),
                    default.threshold_pct,
                )?,
                lock_in_pct: r.parse(
                    "stop_loss.trailing",
                    &format!("tier{n}_lock_in"),
                    default.lock_in_pct,
                )?,
                retain: r.parse("stop_loss.trailing", &format!("tier{n}_retain"), default.retain)?,
            });
        }
        let stop_loss = StopLossConfig {
            enabled: r.bool("stop_loss", "enabled", dl.enabled)?,
            base_threshold_pct: r.parse("stop_loss", "base_threshold_pct", dl.base_threshold_pct)?,
            adaptive,
            trailing: TrailingStopConfig {
                enabled: r.bool("stop_loss.trailing", "enabled", dl.trailing.enabled)?,
                tiers,
            },
            regime_factors: r.regime_table("stop_loss", "regime", dl.regime_factors)?,
        };

        let dsim = &d.simulation;
        let simulation = SimulationParams {
            seed: r.parse("simulation", "seed", dsim.seed)?,
            base_win_rate: r.parse("simulation", "base_win_rate", dsim.base_win_rate)?,
            avg_win: r.parse("simulation", "avg_win", dsim.avg_win)?,
            avg_loss: r.parse("simulation", "avg_loss", dsim.avg_loss)?,
            noise_std: r.parse("simulation", "noise_std", dsim.noise_std)?,
            win_holding_days: r.parse("simulation", "win_holding_days", dsim.win_holding_days)?,
            loss_holding_days: r.parse(
                "simulation",
                "loss_holding_days",
                dsim.loss_holding_days,
            )?,
            holding_std: r.parse("simulation", "holding_std", dsim.holding_std)?,
            win_rate_adjustments: r.regime_table(
                "simulation",
                "win_rate",
                dsim.win_rate_adjustments,
            )?,
        };

        r.warn_missing();

        Ok(StrategyConfig {
            data,
            store,
            logging,
            universe,
            regime,
            indicators,
            signals,
            sizing,
            sector_weights,
            sector_overrides,
            midcap,
            execution,
            stop_loss,
            simulation,
        })
    }

    /// The built-in sector table with `[sector_map]` overrides applied.
    pub fn sector_map(&self) -> SectorMap {
        self.sector_overrides
            .iter()
            .fold(SectorMap::default(), |map, (symbol, sector)| {
                map.with_override(symbol, *sector)
            })
    }
}

fn invalid(section: &str, key: &str, reason: impl ToString) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Typed reads over a [`ConfigPort`] that remember which keys were absent.
struct Reader<'a> {
    port: &'a dyn ConfigPort,
    missing: Vec<String>,
}

impl<'a> Reader<'a> {
    fn new(port: &'a dyn ConfigPort) -> Self {
        Self {
            port,
            missing: Vec::new(),
        }
    }

    fn string(&mut self, section: &str, key: &str) -> Option<String> {
        let value = self
            .port
            .get_string(section, key)
            .filter(|v| !v.trim().is_empty());
        if value.is_none() {
            self.missing.push(format!("[{section}] {key}"));
        }
        value
    }

    fn optional<T: FromStr>(&mut self, section: &str, key: &str) -> Result<Option<T>, TraderError>
    where
        T::Err: ToString,
    {
        match self.port.get_string(section, key) {
            Some(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| invalid(section, key, e)),
            _ => Ok(None),
        }
    }

    fn parse<T: FromStr>(&mut self, section: &str, key: &str, default: T) -> Result<T, TraderError>
    where
        T::Err: ToString,
    {
        match self.optional(section, key)? {
            Some(value) => Ok(value),
            None => {
                self.missing.push(format!("[{section}] {key}"));
                Ok(default)
            }
        }
    }

    fn bool(&mut self, section: &str, key: &str, default: bool) -> Result<bool, TraderError> {
        match self.port.get_string(section, key) {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| invalid(section, key, format!("'{}' is not a boolean", raw.trim()))),
            None => {
                self.missing.push(format!("[{section}] {key}"));
                Ok(default)
            }
        }
    }

    /// Reads `{prefix}_{regime}` for each of the five regimes.
    fn regime_table(
        &mut self,
        section: &str,
        prefix: &str,
        default: RegimeTable,
    ) -> Result<RegimeTable, TraderError> {
        let mut table = default;
        for regime in Regime::ALL {
            let key = format!("{}_{}", prefix, regime.key());
            if let Some(value) = self.optional::<f64>(section, &key)? {
                table.set(regime, value);
            }
        }
        Ok(table)
    }

    fn warn_missing(&self) {
        if self.missing.is_empty() {
            return;
        }
        for key in &self.missing {
            tracing::debug!(key = %key, "config key missing, using default");
        }
        tracing::warn!(
            count = self.missing.len(),
            "config keys missing, using documented defaults"
        );
    }
}

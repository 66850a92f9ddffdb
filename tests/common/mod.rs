#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use regimetrader::domain::config::StrategyConfig;
use regimetrader::domain::error::TraderError;
pub use regimetrader::domain::ohlcv::OhlcvBar;
use regimetrader::domain::position::Position;
use regimetrader::domain::retry::RetryPolicy;
use regimetrader::domain::trade::{ClosedPositionRecord, PositionHistory, TradeRecord};
use regimetrader::ports::broker_port::{Account, BrokerPort, OrderRequest};
use regimetrader::ports::data_port::{DataPort, Timeframe};
use regimetrader::ports::trade_store_port::TradeStorePort;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub calls: Cell<usize>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: Cell::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn get_bars(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TraderError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TraderError::Database {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) => Ok(bars
                .iter()
                .filter(|b| b.date >= start && b.date <= end)
                .cloned()
                .collect()),
            None => Err(TraderError::UpstreamUnavailable {
                service: "mock".into(),
                reason: format!("no bars for {symbol}"),
            }),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub struct RecordingBroker {
    pub buying_power: f64,
    pub positions: Vec<Position>,
    pub rejected: HashSet<String>,
    pub orders: RefCell<Vec<OrderRequest>>,
}

impl RecordingBroker {
    pub fn new(buying_power: f64) -> Self {
        Self {
            buying_power,
            positions: Vec::new(),
            rejected: HashSet::new(),
            orders: RefCell::new(Vec::new()),
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.positions.push(position);
        self
    }

    pub fn rejecting(mut self, symbol: &str) -> Self {
        self.rejected.insert(symbol.to_string());
        self
    }

    pub fn order_symbols(&self) -> Vec<String> {
        self.orders.borrow().iter().map(|o| o.symbol.clone()).collect()
    }
}

impl BrokerPort for RecordingBroker {
    fn get_account(&self) -> Result<Account, TraderError> {
        Ok(Account {
            buying_power: self.buying_power,
        })
    }

    fn list_positions(&self) -> Result<Vec<Position>, TraderError> {
        Ok(self.positions.clone())
    }

    fn submit_order(&self, order: &OrderRequest) -> Result<String, TraderError> {
        if self.rejected.contains(&order.symbol) {
            return Err(TraderError::OrderRejected {
                symbol: order.symbol.clone(),
                reason: "insufficient buying power".into(),
            });
        }
        let mut orders = self.orders.borrow_mut();
        orders.push(order.clone());
        Ok(format!("order-{}", orders.len()))
    }
}

#[derive(Default)]
pub struct MemoryTradeStore {
    pub trades: RefCell<Vec<TradeRecord>>,
    pub closures: RefCell<Vec<ClosedPositionRecord>>,
    pub history: RefCell<HashMap<String, PositionHistory>>,
}

impl MemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, symbol: &str, history: PositionHistory) -> Self {
        self.history.borrow_mut().insert(symbol.to_string(), history);
        self
    }
}

impl TradeStorePort for MemoryTradeStore {
    fn append_trades(&self, _run_id: &str, trades: &[TradeRecord]) -> Result<(), TraderError> {
        self.trades.borrow_mut().extend_from_slice(trades);
        Ok(())
    }

    fn append_closures(
        &self,
        _run_id: &str,
        closures: &[ClosedPositionRecord],
    ) -> Result<(), TraderError> {
        self.closures.borrow_mut().extend_from_slice(closures);
        Ok(())
    }

    fn position_history(&self, symbol: &str) -> Result<PositionHistory, TraderError> {
        Ok(self.history.borrow().get(symbol).copied().unwrap_or_default())
    }

    fn record_peak(&self, symbol: &str, plpc_pct: f64) -> Result<(), TraderError> {
        let mut history = self.history.borrow_mut();
        let entry = history.entry(symbol.to_string()).or_default();
        entry.peak_plpc = Some(entry.peak_plpc.map_or(plpc_pct, |p| p.max(plpc_pct)));
        Ok(())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn as_of() -> NaiveDate {
    date("2024-06-28")
}

pub fn make_bar(symbol: &str, date: NaiveDate, close: f64, volume: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date,
        open: close,
        high: close * 1.005,
        low: close * 0.995,
        close,
        volume,
    }
}

/// `n` daily bars ending at `end`, alternating up and down closes around
/// `base`. Up days trade `up_volume`, down days `down_volume`.
pub fn alternating_bars(
    symbol: &str,
    n: usize,
    end: NaiveDate,
    base: f64,
    up_volume: f64,
    down_volume: f64,
) -> Vec<OhlcvBar> {
    (0..n)
        .map(|i| {
            let day = end - Duration::days((n - 1 - i) as i64);
            let up = i % 2 == 0;
            let close = if up { base * 1.01 } else { base };
            let volume = if up { up_volume } else { down_volume };
            make_bar(symbol, day, close, volume)
        })
        .collect()
}

/// Heavy buying on up days: the volume skew alone saturates the score.
pub fn strong_bars(symbol: &str) -> Vec<OhlcvBar> {
    alternating_bars(symbol, 60, as_of(), 50.0, 3_000_000.0, 1_000_000.0)
}

/// Heavy selling on down days: scores well under the entry threshold.
pub fn weak_bars(symbol: &str) -> Vec<OhlcvBar> {
    alternating_bars(symbol, 60, as_of(), 50.0, 1_000_000.0, 3_000_000.0)
}

pub fn short_bars(symbol: &str) -> Vec<OhlcvBar> {
    alternating_bars(symbol, 12, as_of(), 50.0, 3_000_000.0, 1_000_000.0)
}

/// Default configuration without retry sleeps.
pub fn test_config() -> StrategyConfig {
    let mut config = StrategyConfig::default();
    config.data.retry = RetryPolicy::no_delay(2);
    config
}

//! One trading cycle: regime context, exit checks, scan, balance, execute,
//! persist.
//!
//! Per-symbol and per-position failures are collected as [`SkippedSymbol`]
//! entries and never abort the cycle. Only account-level broker failures and
//! trade store writes propagate as errors.

use crate::domain::balancer::{SectorExposure, balance};
use crate::domain::config::StrategyConfig;
use crate::domain::error::TraderError;
use crate::domain::exit::{ExitInput, evaluate_exit};
use crate::domain::indicator::{IndicatorFrame, compute_indicators};
use crate::domain::market_context::MarketContext;
use crate::domain::position::Position;
use crate::domain::scoring::evaluate_candidate;
use crate::domain::sector::SectorMap;
use crate::domain::signal::Signal;
use crate::domain::sizing::{position_size, shares_for};
use crate::domain::trade::{ClosedPositionRecord, TradeRecord};
use crate::domain::universe::{SkipReason, SkippedSymbol, fetch_series};
use crate::ports::broker_port::{BrokerPort, OrderRequest, OrderSide};
use crate::ports::data_port::DataPort;
use crate::ports::trade_store_port::TradeStorePort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Shared stop request, checked before each symbol and each position.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Identifier stamped on every record written by one cycle.
pub fn new_run_id(as_of: NaiveDate) -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{}-{}", as_of.format("%Y%m%d"), secs)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    pub candidates: Vec<Signal>,
    pub skipped: Vec<SkippedSymbol>,
    pub scanned: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub run_id: String,
    pub as_of: NaiveDate,
    pub context: MarketContext,
    pub scanned: usize,
    pub candidates: usize,
    pub selected: Vec<Signal>,
    pub trades: Vec<TradeRecord>,
    pub closures: Vec<ClosedPositionRecord>,
    pub skipped: Vec<SkippedSymbol>,
    pub cancelled: bool,
}

pub struct TradingCycle<'a> {
    data: &'a dyn DataPort,
    broker: &'a dyn BrokerPort,
    store: &'a dyn TradeStorePort,
    config: &'a StrategyConfig,
    sector_map: SectorMap,
    cancel: CancelFlag,
}

impl<'a> TradingCycle<'a> {
    pub fn new(
        data: &'a dyn DataPort,
        broker: &'a dyn BrokerPort,
        store: &'a dyn TradeStorePort,
        config: &'a StrategyConfig,
    ) -> Self {
        Self {
            data,
            broker,
            store,
            config,
            sector_map: config.sector_map(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(&self, universe: &[String], as_of: NaiveDate) -> Result<CycleReport, TraderError> {
        self.run_with_id(&new_run_id(as_of), universe, as_of)
    }

    pub fn run_with_id(
        &self,
        run_id: &str,
        universe: &[String],
        as_of: NaiveDate,
    ) -> Result<CycleReport, TraderError> {
        tracing::info!(run_id, %as_of, symbols = universe.len(), "cycle started");

        let context = MarketContext::build(self.data, self.config, as_of);
        let positions = self.broker.list_positions()?;

        let mut skipped = Vec::new();
        let closures = self.check_exits(run_id, &positions, &context, &mut skipped);

        let scan = self.scan(universe, &context);
        skipped.extend(scan.skipped);
        let candidates = scan.candidates.len();
        let selected = balance(scan.candidates, self.config);

        let held: HashSet<&str> = positions.iter().map(|p| p.symbol.as_str()).collect();
        let trades = self.execute(run_id, &selected, &held, as_of, &mut skipped)?;

        if !trades.is_empty() {
            self.store.append_trades(run_id, &trades)?;
        }
        if !closures.is_empty() {
            self.store.append_closures(run_id, &closures)?;
        }

        let cancelled = self.cancel.is_cancelled();
        tracing::info!(
            run_id,
            scanned = scan.scanned,
            candidates,
            selected = selected.len(),
            trades = trades.len(),
            closures = closures.len(),
            skipped = skipped.len(),
            cancelled,
            "cycle finished"
        );

        Ok(CycleReport {
            run_id: run_id.to_string(),
            as_of,
            context,
            scanned: scan.scanned,
            candidates,
            selected,
            trades,
            closures,
            skipped,
            cancelled,
        })
    }

    pub fn scan(&self, universe: &[String], context: &MarketContext) -> ScanOutcome {
        scan_universe(self.data, self.config, &self.sector_map, universe, context, &self.cancel)
    }

    fn check_exits(
        &self,
        run_id: &str,
        positions: &[Position],
        context: &MarketContext,
        skipped: &mut Vec<SkippedSymbol>,
    ) -> Vec<ClosedPositionRecord> {
        let mut closures = Vec::new();
        for (i, position) in positions.iter().enumerate() {
            if self.cancel.is_cancelled() {
                let rest: Vec<String> = positions[i..].iter().map(|p| p.symbol.clone()).collect();
                mark_cancelled(&rest, skipped);
                break;
            }
            if !position.is_long() {
                tracing::debug!(symbol = %position.symbol, qty = position.qty, "not long, exit check skipped");
                continue;
            }
            match self.check_exit(run_id, position, context) {
                Ok(Some(record)) => closures.push(record),
                Ok(None) => {}
                Err(reason) => {
                    tracing::warn!(symbol = %position.symbol, reason = %reason, "exit check skipped");
                    skipped.push(SkippedSymbol {
                        symbol: position.symbol.clone(),
                        reason,
                    });
                }
            }
        }
        closures
    }

    fn check_exit(
        &self,
        run_id: &str,
        position: &Position,
        context: &MarketContext,
    ) -> Result<Option<ClosedPositionRecord>, SkipReason> {
        let symbol = position.symbol.as_str();
        let history = self
            .store
            .position_history(symbol)
            .map_err(|e| SkipReason::ExitFailed(e.to_string()))?;
        let frame = frame_for(self.data, self.config, symbol, context.as_of)?;
        let input = ExitInput {
            position,
            frame: &frame,
            context,
            sector: self.sector_map.sector_of(symbol),
            history: &history,
        };
        let Some(decision) = evaluate_exit(&input, self.config) else {
            return Ok(None);
        };

        if let Err(e) = self.store.record_peak(symbol, decision.plpc_pct) {
            tracing::warn!(symbol, error = %e, "could not record profit peak");
        }
        if !decision.triggered {
            return Ok(None);
        }

        let order = OrderRequest::market_day(symbol, position.qty.abs(), OrderSide::Sell);
        let order_id = self
            .broker
            .submit_order(&order)
            .map_err(|e| SkipReason::ExitFailed(e.to_string()))?;
        tracing::info!(
            symbol,
            order_id = %order_id,
            plpc_pct = decision.plpc_pct,
            threshold = decision.final_threshold,
            stop_type = %decision.stop_type,
            "position closed"
        );
        Ok(Some(decision.closure_record(run_id, position, context.as_of)))
    }

    fn execute(
        &self,
        run_id: &str,
        selected: &[Signal],
        held: &HashSet<&str>,
        as_of: NaiveDate,
        skipped: &mut Vec<SkippedSymbol>,
    ) -> Result<Vec<TradeRecord>, TraderError> {
        let execution = &self.config.execution;
        let buying_power = self.broker.get_account()?.buying_power;
        let mut exposure = SectorExposure::new(execution.sector_cap());
        let mut committed = 0.0_f64;
        let mut trades = Vec::new();

        for (i, signal) in selected.iter().enumerate() {
            if trades.len() >= execution.max_trades_per_run {
                break;
            }
            if self.cancel.is_cancelled() {
                let rest: Vec<String> = selected[i..].iter().map(|s| s.symbol.clone()).collect();
                mark_cancelled(&rest, skipped);
                break;
            }
            if held.contains(signal.symbol.as_str()) {
                tracing::debug!(symbol = %signal.symbol, "already held");
                continue;
            }
            if !exposure.try_claim(signal.sector) {
                tracing::debug!(symbol = %signal.symbol, sector = %signal.sector, "sector full");
                continue;
            }

            let remaining = (execution.max_capital_per_direction - committed).max(0.0);
            let size = position_size(signal, buying_power, self.config).min(remaining);
            let shares = shares_for(size, signal.price);
            if shares <= 0.0 {
                tracing::debug!(symbol = %signal.symbol, size, "nothing to buy");
                exposure.release(signal.sector);
                continue;
            }

            let order = OrderRequest::market_day(&signal.symbol, shares, OrderSide::Buy);
            match self.broker.submit_order(&order) {
                Ok(order_id) => {
                    committed += size;
                    tracing::info!(
                        symbol = %signal.symbol,
                        shares,
                        size,
                        score = signal.score,
                        order_id = %order_id,
                        "order submitted"
                    );
                    trades.push(TradeRecord::from_signal(run_id, signal, shares, as_of, &order_id));
                }
                Err(e) => {
                    tracing::warn!(symbol = %signal.symbol, error = %e, "order rejected");
                    exposure.release(signal.sector);
                    skipped.push(SkippedSymbol {
                        symbol: signal.symbol.clone(),
                        reason: SkipReason::OrderFailed(e.to_string()),
                    });
                }
            }
        }
        Ok(trades)
    }
}

/// Scores every symbol in `universe` against `context`. The result is not
/// balanced.
pub fn scan_universe(
    data: &dyn DataPort,
    config: &StrategyConfig,
    sector_map: &SectorMap,
    universe: &[String],
    context: &MarketContext,
    cancel: &CancelFlag,
) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    for (i, symbol) in universe.iter().enumerate() {
        if cancel.is_cancelled() {
            mark_cancelled(&universe[i..], &mut outcome.skipped);
            break;
        }
        outcome.scanned += 1;
        let frame = match frame_for(data, config, symbol, context.as_of) {
            Ok(frame) => frame,
            Err(reason) => {
                tracing::info!(symbol = %symbol, reason = %reason, "symbol skipped");
                outcome.skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason,
                });
                continue;
            }
        };
        if let Some(signal) = evaluate_candidate(&frame, context, config, sector_map) {
            tracing::debug!(symbol = %symbol, score = signal.score, tier = %signal.tier, "candidate");
            outcome.candidates.push(signal);
        }
    }
    tracing::info!(
        scanned = outcome.scanned,
        candidates = outcome.candidates.len(),
        skipped = outcome.skipped.len(),
        "scan finished"
    );
    outcome
}

fn frame_for(
    data: &dyn DataPort,
    config: &StrategyConfig,
    symbol: &str,
    as_of: NaiveDate,
) -> Result<IndicatorFrame, SkipReason> {
    let series =
        fetch_series(data, symbol, &config.data, as_of).map_err(|e| SkipReason::from_error(&e))?;
    let params = &config.indicators;
    compute_indicators(&series, params).ok_or(SkipReason::InsufficientHistory {
        rows: series.len(),
        minimum: params.min_rows(),
    })
}

fn mark_cancelled(symbols: &[String], skipped: &mut Vec<SkippedSymbol>) {
    tracing::warn!(remaining = symbols.len(), "cycle cancelled");
    skipped.extend(symbols.iter().map(|s| SkippedSymbol {
        symbol: s.clone(),
        reason: SkipReason::Cancelled,
    }));
}

//! CLI definition and dispatch.
//!
//! Command results go to stdout; diagnostics go to stderr through `tracing`.

use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_trade_store::CsvTradeStore;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_broker::{PaperBroker, load_positions_csv};
#[cfg(feature = "sqlite")]
use crate::adapters::sqlite_adapter::SqliteAdapter;
use crate::domain::balancer::balance;
use crate::domain::config::{LogFormat, StoreKind, StrategyConfig};
use crate::domain::config_validation::validate_strategy_config;
use crate::domain::cycle::{CancelFlag, CycleReport, TradingCycle, scan_universe};
use crate::domain::error::TraderError;
use crate::domain::market_context::MarketContext;
use crate::domain::metrics::SimulationMetrics;
use crate::domain::sector::Sector;
use crate::domain::signal::Signal;
use crate::domain::simulator::{OutcomeSimulator, SyntheticSimulator};
use crate::domain::universe::{SkippedSymbol, resolve_universe};
use crate::logging::init_logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::trade_store_port::TradeStorePort;

#[derive(Parser, Debug)]
#[command(name = "regimetrader", about = "Regime-aware equity signal pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the market and sector regimes
    Regime {
        #[arg(short, long)]
        config: PathBuf,
        /// Evaluation date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Print the balanced candidate list without placing orders
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Run a full cycle against the paper broker and persist the results
    Cycle {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Paper account buying power, defaults to sizing.initial_capital
        #[arg(long)]
        buying_power: Option<f64>,
        /// CSV of open positions: symbol,qty,avg_entry_price,current_price
        #[arg(long)]
        positions: Option<PathBuf>,
    },
    /// Scan, balance and simulate synthetic outcomes
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        seed: Option<u64>,
        /// Starting capital, defaults to sizing.initial_capital
        #[arg(long)]
        capital: Option<f64>,
    },
    /// Load and validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Regime { config, as_of } => run_regime(&config, as_of),
        Command::Scan { config, as_of } => run_scan(&config, as_of),
        Command::Cycle {
            config,
            as_of,
            buying_power,
            positions,
        } => run_cycle(&config, as_of, buying_power, positions.as_deref()),
        Command::Simulate {
            config,
            as_of,
            seed,
            capital,
        } => run_simulate(&config, as_of, seed, capital),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Reads the file, starts logging from its `[logging]` section, then builds
/// and validates the strategy configuration.
pub fn load_config(path: &Path) -> Result<(FileConfigAdapter, StrategyConfig), TraderError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    let level = adapter
        .get_string("logging", "level")
        .unwrap_or_else(|| "info".to_string());
    let format = adapter
        .get_string("logging", "format")
        .and_then(|f| f.parse().ok())
        .unwrap_or(LogFormat::Pretty);
    init_logging(&level, format);

    let config = StrategyConfig::from_port(&adapter)?;
    validate_strategy_config(&config)?;
    Ok((adapter, config))
}

/// Today's UTC date from the system clock.
pub fn today() -> NaiveDate {
    let days = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() / 86_400)
        .unwrap_or(0);
    NaiveDate::default() + Duration::days(days as i64)
}

pub fn build_data_port(
    adapter: &dyn ConfigPort,
    config: &StrategyConfig,
) -> Result<Box<dyn DataPort>, TraderError> {
    if let Some(dir) = &config.data.dir {
        return Ok(Box::new(CsvAdapter::new(dir.clone())));
    }
    #[cfg(feature = "sqlite")]
    if adapter.get_string("sqlite", "path").is_some() {
        return Ok(Box::new(SqliteAdapter::from_config(adapter)?));
    }
    #[cfg(not(feature = "sqlite"))]
    let _ = adapter;
    Err(TraderError::ConfigMissing {
        section: "data".into(),
        key: "dir".into(),
    })
}

pub fn build_trade_store(
    adapter: &dyn ConfigPort,
    config: &StrategyConfig,
) -> Result<Box<dyn TradeStorePort>, TraderError> {
    match config.store.kind {
        StoreKind::Csv => Ok(Box::new(CsvTradeStore::new(config.store.dir.clone())?)),
        #[cfg(feature = "sqlite")]
        StoreKind::Sqlite => Ok(Box::new(SqliteAdapter::from_config(adapter)?)),
        #[cfg(not(feature = "sqlite"))]
        StoreKind::Sqlite => {
            let _ = adapter;
            Err(TraderError::ConfigInvalid {
                section: "store".into(),
                key: "kind".into(),
                reason: "built without sqlite support".into(),
            })
        }
    }
}

fn run_regime(config_path: &Path, as_of: Option<NaiveDate>) -> Result<(), TraderError> {
    let (adapter, config) = load_config(config_path)?;
    let data = build_data_port(&adapter, &config)?;
    let as_of = as_of.unwrap_or_else(today);
    let ctx = MarketContext::build(data.as_ref(), &config, as_of);
    print_context(&ctx);
    Ok(())
}

fn run_scan(config_path: &Path, as_of: Option<NaiveDate>) -> Result<(), TraderError> {
    let (adapter, config) = load_config(config_path)?;
    let data = build_data_port(&adapter, &config)?;
    let as_of = as_of.unwrap_or_else(today);

    let (ctx, selected, skipped) = scan_and_balance(data.as_ref(), &config, as_of)?;
    println!(
        "As of {}: market {} ({:+.2})",
        as_of, ctx.market.regime, ctx.market.score
    );
    print_signals(&selected);
    print_skipped(&skipped);
    Ok(())
}

fn run_cycle(
    config_path: &Path,
    as_of: Option<NaiveDate>,
    buying_power: Option<f64>,
    positions: Option<&Path>,
) -> Result<(), TraderError> {
    let (adapter, config) = load_config(config_path)?;
    let data = build_data_port(&adapter, &config)?;
    let store = build_trade_store(&adapter, &config)?;
    let as_of = as_of.unwrap_or_else(today);

    let mut broker = PaperBroker::new(buying_power.unwrap_or(config.sizing.initial_capital));
    if let Some(path) = positions {
        broker = broker.with_positions(load_positions_csv(path)?);
    }

    let universe = resolve_universe(&config.universe, data.as_ref(), &config.data.benchmark)?;
    let cycle = TradingCycle::new(data.as_ref(), &broker, store.as_ref(), &config);
    let report = cycle.run(&universe, as_of)?;
    print_report(&report);
    Ok(())
}

fn run_simulate(
    config_path: &Path,
    as_of: Option<NaiveDate>,
    seed: Option<u64>,
    capital: Option<f64>,
) -> Result<(), TraderError> {
    let (adapter, config) = load_config(config_path)?;
    let data = build_data_port(&adapter, &config)?;
    let as_of = as_of.unwrap_or_else(today);

    let (_, selected, skipped) = scan_and_balance(data.as_ref(), &config, as_of)?;
    let seed = seed.unwrap_or(config.simulation.seed);
    let capital = capital.unwrap_or(config.sizing.initial_capital);
    let mut simulator = SyntheticSimulator::with_seed(&config, seed)?;
    let run = simulator.simulate(&selected, as_of, capital);
    let metrics = SimulationMetrics::compute(&run);

    println!("Simulated {} signals (seed {}), {} skipped", selected.len(), seed, run.skipped);
    println!("Trades:           {}", metrics.total_trades);
    println!("Winners/Losers:   {}/{}", metrics.winners, metrics.losers);
    println!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    println!("Profit Factor:    {:.2}", metrics.profit_factor);
    println!("Avg Win:          {:.2}%", metrics.avg_win_pct);
    println!("Avg Loss:         {:.2}%", metrics.avg_loss_pct);
    println!("Avg Holding:      {:.1} days", metrics.avg_holding_days);
    println!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    println!(
        "Capital:          {:.2} -> {:.2} ({:+.2}%)",
        metrics.initial_capital,
        metrics.final_capital,
        metrics.total_return * 100.0
    );
    for tier in &metrics.by_tier {
        println!(
            "  {}:  {} trades, {:.1}% win rate, {:+.2}% avg",
            tier.tier,
            tier.count,
            tier.win_rate * 100.0,
            tier.avg_pl_pct
        );
    }
    print_skipped(&skipped);
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), TraderError> {
    let (_, config) = load_config(config_path)?;
    println!("Configuration is valid: {}", config_path.display());
    println!(
        "  universe: {}",
        if config.universe.is_empty() {
            "all symbols from data source".to_string()
        } else {
            format!("{} symbols", config.universe.len())
        }
    );
    println!("  store: {:?}", config.store.kind);
    println!(
        "  max trades/run: {}, sector cap: {}",
        config.execution.max_trades_per_run,
        config.execution.sector_cap()
    );
    Ok(())
}

fn scan_and_balance(
    data: &dyn DataPort,
    config: &StrategyConfig,
    as_of: NaiveDate,
) -> Result<(MarketContext, Vec<Signal>, Vec<SkippedSymbol>), TraderError> {
    let universe = resolve_universe(&config.universe, data, &config.data.benchmark)?;
    let ctx = MarketContext::build(data, config, as_of);
    let outcome = scan_universe(
        data,
        config,
        &config.sector_map(),
        &universe,
        &ctx,
        &CancelFlag::new(),
    );
    let selected = balance(outcome.candidates, config);
    Ok((ctx, selected, outcome.skipped))
}

fn print_context(ctx: &MarketContext) {
    println!("As of {}", ctx.as_of);
    println!(
        "Market:     {} (score {:+.2}{}), volatility {}",
        ctx.market.regime,
        ctx.market.score,
        if ctx.market.degraded { ", degraded" } else { "" },
        ctx.volatility
    );
    for sector in Sector::TRADED {
        let reading = ctx.sectors.get(sector);
        let (regime, score, degraded) = reading
            .map(|r| (r.regime.as_str(), r.score, r.degraded))
            .unwrap_or(("NEUTRAL", 0.0, true));
        println!(
            "  {:<24} {:<5} {:<15} {:+.0}{}",
            sector.name(),
            sector.proxy_etf().unwrap_or("-"),
            regime,
            score,
            if degraded { " (degraded)" } else { "" }
        );
    }
}

fn print_signals(signals: &[Signal]) {
    if signals.is_empty() {
        println!("No candidates.");
        return;
    }
    println!(
        "{:<8} {:>6} {:<8} {:<24} {:<15} {:>8} {:>4}",
        "SYMBOL", "SCORE", "TIER", "SECTOR", "SECTOR REGIME", "PRIORITY", "MID"
    );
    for s in signals {
        println!(
            "{:<8} {:>6.3} {:<8} {:<24} {:<15} {:>8.3} {:>4}",
            s.symbol,
            s.score,
            s.tier.as_str(),
            s.sector.name(),
            s.sector_regime.as_str(),
            s.priority,
            if s.is_midcap { "yes" } else { "" }
        );
    }
}

fn print_skipped(skipped: &[SkippedSymbol]) {
    if skipped.is_empty() {
        return;
    }
    println!("Skipped {}:", skipped.len());
    for s in skipped {
        println!("  {}: {}", s.symbol, s.reason);
    }
}

fn print_report(report: &CycleReport) {
    println!("Run {} as of {}", report.run_id, report.as_of);
    println!(
        "Market {} ({:+.2}), volatility {}",
        report.context.market.regime, report.context.market.score, report.context.volatility
    );
    println!(
        "Scanned {}, candidates {}, selected {}",
        report.scanned,
        report.candidates,
        report.selected.len()
    );
    if !report.closures.is_empty() {
        println!("Closed {}:", report.closures.len());
        for c in &report.closures {
            println!(
                "  {} {:.2} shares at {:+.2}% ({} stop at {:+.2}%)",
                c.symbol, c.qty, c.pl_pct, c.stop_type, c.final_threshold
            );
        }
    }
    if !report.trades.is_empty() {
        println!("Opened {}:", report.trades.len());
        for t in &report.trades {
            println!(
                "  {} {:.2} @ {:.2} score {:.3} {} [{}]",
                t.symbol, t.shares, t.entry_price, t.signal_score, t.tier, t.order_id
            );
        }
    }
    print_skipped(&report.skipped);
    if report.cancelled {
        println!("Cycle was cancelled before completion.");
    }
}

//! SQLite adapter: bar storage for [`DataPort`] and run records for
//! [`TradeStorePort`].
//!
//! Dates are stored as `YYYY-MM-DD` text.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::trade::{ClosedPositionRecord, PositionHistory, TradeRecord};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, Timeframe};
use crate::ports::trade_store_port::TradeStorePort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

const DATE_FMT: &str = "%Y-%m-%d";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS ohlcv (
        symbol TEXT NOT NULL,
        date TEXT NOT NULL,
        open REAL NOT NULL,
        high REAL NOT NULL,
        low REAL NOT NULL,
        close REAL NOT NULL,
        volume REAL NOT NULL,
        PRIMARY KEY (symbol, date)
    );
    CREATE INDEX IF NOT EXISTS idx_ohlcv_date ON ohlcv(date);
    CREATE TABLE IF NOT EXISTS trades (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id TEXT NOT NULL,
        symbol TEXT NOT NULL,
        direction TEXT NOT NULL,
        entry_price REAL NOT NULL,
        shares REAL NOT NULL,
        entry_date TEXT NOT NULL,
        exit_price REAL,
        exit_date TEXT,
        signal_score REAL NOT NULL,
        sector TEXT NOT NULL,
        tier TEXT NOT NULL,
        market_regime TEXT NOT NULL,
        sector_regime TEXT NOT NULL,
        order_id TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_trades_symbol ON trades(symbol);
    CREATE TABLE IF NOT EXISTS closed_positions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id TEXT NOT NULL,
        symbol TEXT NOT NULL,
        direction TEXT NOT NULL,
        qty REAL NOT NULL,
        entry_price REAL NOT NULL,
        exit_price REAL NOT NULL,
        pl_pct REAL NOT NULL,
        exit_date TEXT NOT NULL,
        reason TEXT NOT NULL,
        stop_type TEXT NOT NULL,
        market_regime TEXT NOT NULL,
        sector_regime TEXT NOT NULL,
        market_volatility TEXT NOT NULL,
        signal_quality REAL,
        position_age_days INTEGER,
        base_threshold REAL NOT NULL,
        atr_factor REAL NOT NULL,
        volatility_change_factor REAL NOT NULL,
        market_volatility_factor REAL NOT NULL,
        market_regime_factor REAL NOT NULL,
        sector_regime_factor REAL NOT NULL,
        signal_quality_factor REAL NOT NULL,
        time_factor REAL NOT NULL,
        adaptive_threshold REAL NOT NULL,
        trailing_threshold REAL,
        final_threshold REAL NOT NULL
    );
    CREATE TABLE IF NOT EXISTS position_peaks (
        symbol TEXT PRIMARY KEY,
        peak_plpc REAL NOT NULL
    );";

fn pool_err(e: r2d2::Error) -> TraderError {
    TraderError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> TraderError {
    TraderError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(text: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(text, DATE_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            text.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    /// Opens `[sqlite] path`, falling back to `[store] path`, and makes sure
    /// the schema exists.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TraderError> {
        let db_path = config
            .get_string("sqlite", "path")
            .or_else(|| config.get_string("store", "path"))
            .ok_or_else(|| TraderError::ConfigMissing {
                section: "sqlite".into(),
                key: "path".into(),
            })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        tracing::info!(path = %db_path, pool_size, "sqlite store opened");
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, TraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, TraderError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), TraderError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)
    }

    pub fn insert_bars(&self, bars: &[OhlcvBar]) -> Result<(), TraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO ohlcv (symbol, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    bar.symbol,
                    bar.date.format(DATE_FMT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)
    }

    /// Trade rows for `symbol`, oldest first.
    pub fn trades_for(&self, symbol: &str) -> Result<Vec<TradeRecord>, TraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT run_id, symbol, direction, entry_price, shares, entry_date, exit_price,
                        exit_date, signal_score, sector, tier, market_regime, sector_regime, order_id
                 FROM trades WHERE symbol = ?1 ORDER BY id ASC",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![symbol], |row| {
                let entry_date: String = row.get(5)?;
                let exit_date: Option<String> = row.get(7)?;
                Ok(TradeRecord {
                    run_id: row.get(0)?,
                    symbol: row.get(1)?,
                    direction: row.get(2)?,
                    entry_price: row.get(3)?,
                    shares: row.get(4)?,
                    entry_date: parse_date(&entry_date)?,
                    exit_price: row.get(6)?,
                    exit_date: exit_date.as_deref().map(parse_date).transpose()?,
                    signal_score: row.get(8)?,
                    sector: row.get(9)?,
                    tier: row.get(10)?,
                    market_regime: row.get(11)?,
                    sector_regime: row.get(12)?,
                    order_id: row.get(13)?,
                })
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    /// Number of closure rows written under `run_id`.
    pub fn closure_count(&self, run_id: &str) -> Result<usize, TraderError> {
        let count: i64 = self
            .conn()?
            .query_row(
                "SELECT COUNT(*) FROM closed_positions WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        Ok(count as usize)
    }
}

impl DataPort for SqliteAdapter {
    fn get_bars(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, date, open, high, low, close, volume
                 FROM ohlcv
                 WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![
                    symbol,
                    start.format(DATE_FMT).to_string(),
                    end.format(DATE_FMT).to_string()
                ],
                |row| {
                    let date: String = row.get(1)?;
                    Ok(OhlcvBar {
                        symbol: row.get(0)?,
                        date: parse_date(&date)?,
                        open: row.get(2)?,
                        high: row.get(3)?,
                        low: row.get(4)?,
                        close: row.get(5)?,
                        volume: row.get(6)?,
                    })
                },
            )
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM ohlcv ORDER BY symbol")
            .map_err(query_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_err)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(query_err)
    }
}

impl TradeStorePort for SqliteAdapter {
    fn append_trades(&self, run_id: &str, trades: &[TradeRecord]) -> Result<(), TraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for t in trades {
            tx.execute(
                "INSERT INTO trades (run_id, symbol, direction, entry_price, shares, entry_date,
                    exit_price, exit_date, signal_score, sector, tier, market_regime,
                    sector_regime, order_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    run_id,
                    t.symbol,
                    t.direction,
                    t.entry_price,
                    t.shares,
                    t.entry_date.format(DATE_FMT).to_string(),
                    t.exit_price,
                    t.exit_date.map(|d| d.format(DATE_FMT).to_string()),
                    t.signal_score,
                    t.sector,
                    t.tier,
                    t.market_regime,
                    t.sector_regime,
                    t.order_id
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        tracing::debug!(run_id, rows = trades.len(), "trades stored");
        Ok(())
    }

    /// Stores the closures, marks the symbol's open trades as exited and
    /// clears its profit peak.
    fn append_closures(
        &self,
        run_id: &str,
        closures: &[ClosedPositionRecord],
    ) -> Result<(), TraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for c in closures {
            let exit_date = c.exit_date.format(DATE_FMT).to_string();
            tx.execute(
                "INSERT INTO closed_positions (run_id, symbol, direction, qty, entry_price,
                    exit_price, pl_pct, exit_date, reason, stop_type, market_regime,
                    sector_regime, market_volatility, signal_quality, position_age_days,
                    base_threshold, atr_factor, volatility_change_factor, market_volatility_factor,
                    market_regime_factor, sector_regime_factor, signal_quality_factor,
                    time_factor, adaptive_threshold, trailing_threshold, final_threshold)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                    ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)",
                params![
                    run_id,
                    c.symbol,
                    c.direction,
                    c.qty,
                    c.entry_price,
                    c.exit_price,
                    c.pl_pct,
                    exit_date,
                    c.reason,
                    c.stop_type,
                    c.market_regime,
                    c.sector_regime,
                    c.market_volatility,
                    c.signal_quality,
                    c.position_age_days,
                    c.base_threshold,
                    c.atr_factor,
                    c.volatility_change_factor,
                    c.market_volatility_factor,
                    c.market_regime_factor,
                    c.sector_regime_factor,
                    c.signal_quality_factor,
                    c.time_factor,
                    c.adaptive_threshold,
                    c.trailing_threshold,
                    c.final_threshold
                ],
            )
            .map_err(query_err)?;
            tx.execute(
                "UPDATE trades SET exit_price = ?1, exit_date = ?2
                 WHERE symbol = ?3 AND exit_date IS NULL",
                params![c.exit_price, exit_date, c.symbol],
            )
            .map_err(query_err)?;
            tx.execute("DELETE FROM position_peaks WHERE symbol = ?1", params![c.symbol])
                .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        tracing::debug!(run_id, rows = closures.len(), "closures stored");
        Ok(())
    }

    fn position_history(&self, symbol: &str) -> Result<PositionHistory, TraderError> {
        let conn = self.conn()?;
        let entry: Option<String> = conn
            .query_row(
                "SELECT MAX(entry_date) FROM trades WHERE symbol = ?1 AND exit_date IS NULL",
                params![symbol],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        let peak: Option<f64> = conn
            .query_row(
                "SELECT peak_plpc FROM position_peaks WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)?;
        let entry_date = entry.as_deref().map(parse_date).transpose().map_err(query_err)?;
        Ok(PositionHistory {
            entry_date,
            peak_plpc: peak,
        })
    }

    fn record_peak(&self, symbol: &str, plpc_pct: f64) -> Result<(), TraderError> {
        self.conn()?
            .execute(
                "INSERT INTO position_peaks (symbol, peak_plpc) VALUES (?1, ?2)
                 ON CONFLICT(symbol) DO UPDATE SET peak_plpc = MAX(peak_plpc, excluded.peak_plpc)",
                params![symbol, plpc_pct],
            )
            .map_err(query_err)?;
        Ok(())
    }
}

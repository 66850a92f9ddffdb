//! CSV trade store.
//!
//! `trades.csv` and `closed_positions.csv` are append-only, with a header
//! written when the file is created. `peaks.csv` holds one row per held
//! symbol and is rewritten on every change.

use crate::domain::error::TraderError;
use crate::domain::trade::{ClosedPositionRecord, PositionHistory, TradeRecord};
use crate::ports::trade_store_port::TradeStorePort;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

const TRADES_FILE: &str = "trades.csv";
const CLOSURES_FILE: &str = "closed_positions.csv";
const PEAKS_FILE: &str = "peaks.csv";

#[derive(Debug, Serialize, Deserialize)]
struct PeakRow {
    symbol: String,
    peak_plpc: f64,
}

fn csv_err(path: &Path, e: impl std::fmt::Display) -> TraderError {
    TraderError::Database {
        reason: format!("{}: {}", path.display(), e),
    }
}

pub struct CsvTradeStore {
    dir: PathBuf,
}

impl CsvTradeStore {
    /// Creates `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, TraderError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append<T: Serialize>(&self, file: &str, rows: &[T]) -> Result<(), TraderError> {
        let path = self.dir.join(file);
        let is_new = !path.exists() || fs::metadata(&path)?.len() == 0;
        let handle = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(handle);
        for row in rows {
            writer.serialize(row).map_err(|e| csv_err(&path, e))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn read_all<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, TraderError> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| csv_err(&path, e))?;
        rdr.deserialize()
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| csv_err(&path, e))
    }

    pub fn trades(&self) -> Result<Vec<TradeRecord>, TraderError> {
        self.read_all(TRADES_FILE)
    }

    pub fn closures(&self) -> Result<Vec<ClosedPositionRecord>, TraderError> {
        self.read_all(CLOSURES_FILE)
    }

    fn peaks(&self) -> Result<BTreeMap<String, f64>, TraderError> {
        Ok(self
            .read_all::<PeakRow>(PEAKS_FILE)?
            .into_iter()
            .map(|r| (r.symbol, r.peak_plpc))
            .collect())
    }

    fn write_peaks(&self, peaks: &BTreeMap<String, f64>) -> Result<(), TraderError> {
        let path = self.dir.join(PEAKS_FILE);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| csv_err(&path, e))?;
        for (symbol, peak_plpc) in peaks {
            writer
                .serialize(PeakRow {
                    symbol: symbol.clone(),
                    peak_plpc: *peak_plpc,
                })
                .map_err(|e| csv_err(&path, e))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl TradeStorePort for CsvTradeStore {
    fn append_trades(&self, run_id: &str, trades: &[TradeRecord]) -> Result<(), TraderError> {
        self.append(TRADES_FILE, trades)?;
        tracing::debug!(run_id, rows = trades.len(), dir = %self.dir.display(), "trades appended");
        Ok(())
    }

    fn append_closures(
        &self,
        run_id: &str,
        closures: &[ClosedPositionRecord],
    ) -> Result<(), TraderError> {
        self.append(CLOSURES_FILE, closures)?;
        let mut peaks = self.peaks()?;
        let before = peaks.len();
        for c in closures {
            peaks.remove(&c.symbol);
        }
        if peaks.len() != before {
            self.write_peaks(&peaks)?;
        }
        tracing::debug!(run_id, rows = closures.len(), "closures appended");
        Ok(())
    }

    /// Latest entry after the symbol's last recorded exit.
    fn position_history(&self, symbol: &str) -> Result<PositionHistory, TraderError> {
        let last_exit = self
            .closures()?
            .into_iter()
            .filter(|c| c.symbol == symbol)
            .map(|c| c.exit_date)
            .max();
        let entry_date = self
            .trades()?
            .into_iter()
            .filter(|t| t.symbol == symbol)
            .map(|t| t.entry_date)
            .filter(|d| last_exit.is_none_or(|exit| *d > exit))
            .max();
        Ok(PositionHistory {
            entry_date,
            peak_plpc: self.peaks()?.get(symbol).copied(),
        })
    }

    fn record_peak(&self, symbol: &str, plpc_pct: f64) -> Result<(), TraderError> {
        let mut peaks = self.peaks()?;
        let peak = peaks.entry(symbol.to_string()).or_insert(plpc_pct);
        if plpc_pct > *peak {
            *peak = plpc_pct;
        }
        self.write_peaks(&peaks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn trade(symbol: &str, day: u32) -> TradeRecord {
        TradeRecord {
            run_id: "r1".into(),
            symbol: symbol.into(),
            direction: "LONG".into(),
            entry_price: 42.0,
            shares: 10.25,
            entry_date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            exit_price: None,
            exit_date: None,
            signal_score: 0.87,
            sector: "Industrials".into(),
            tier: "Tier 2".into(),
            market_regime: "NEUTRAL".into(),
            sector_regime: "BULLISH".into(),
            order_id: "paper-00001".into(),
        }
    }

    fn closure(symbol: &str, day: u32) -> ClosedPositionRecord {
        ClosedPositionRecord {
            run_id: "r2".into(),
            symbol: symbol.into(),
            direction: "LONG".into(),
            qty: 10.25,
            entry_price: 42.0,
            exit_price: 45.0,
            pl_pct: 7.14,
            exit_date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            reason: "stop_loss".into(),
            stop_type: "trailing".into(),
            market_regime: "NEUTRAL".into(),
            sector_regime: "BULLISH".into(),
            market_volatility: "LOW".into(),
            signal_quality: None,
            position_age_days: None,
            base_threshold: -2.0,
            atr_factor: 0.8,
            volatility_change_factor: 1.0,
            market_volatility_factor: 0.9,
            market_regime_factor: 1.0,
            sector_regime_factor: 1.1,
            signal_quality_factor: 1.0,
            time_factor: 1.0,
            adaptive_threshold: -1.58,
            trailing_threshold: Some(7.5),
            final_threshold: 7.5,
        }
    }

    #[test]
    fn appends_keep_a_single_header() {
        let dir = TempDir::new().unwrap();
        let store = CsvTradeStore::new(dir.path()).unwrap();
        store.append_trades("r1", &[trade("CAT", 1)]).unwrap();
        store.append_trades("r1", &[trade("DE", 2)]).unwrap();

        let content = fs::read_to_string(dir.path().join(TRADES_FILE)).unwrap();
        assert_eq!(content.matches("run_id").count(), 1);
        let trades = store.trades().unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[1].symbol, "DE");
        assert_eq!(trades[0].exit_date, None);
    }

    #[test]
    fn closures_round_trip_optional_fields() {
        let dir = TempDir::new().unwrap();
        let store = CsvTradeStore::new(dir.path().join("nested")).unwrap();
        store.append_closures("r2", &[closure("CAT", 10)]).unwrap();
        let closures = store.closures().unwrap();
        assert_eq!(closures.len(), 1);
        assert_eq!(closures[0].signal_quality, None);
        assert_eq!(closures[0].trailing_threshold, Some(7.5));
    }

    #[test]
    fn peak_only_rises() {
        let dir = TempDir::new().unwrap();
        let store = CsvTradeStore::new(dir.path()).unwrap();
        store.record_peak("CAT", 3.0).unwrap();
        store.record_peak("CAT", 1.0).unwrap();
        store.record_peak("DE", -1.0).unwrap();
        assert_eq!(store.position_history("CAT").unwrap().peak_plpc, Some(3.0));
        store.record_peak("CAT", 6.5).unwrap();
        assert_eq!(store.position_history("CAT").unwrap().peak_plpc, Some(6.5));
        assert_eq!(store.position_history("DE").unwrap().peak_plpc, Some(-1.0));
    }

    #[test]
    fn history_resets_after_closure() {
        let dir = TempDir::new().unwrap();
        let store = CsvTradeStore::new(dir.path()).unwrap();
        store.append_trades("r1", &[trade("CAT", 1)]).unwrap();
        store.record_peak("CAT", 8.0).unwrap();
        assert_eq!(
            store.position_history("CAT").unwrap().entry_date,
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );

        store.append_closures("r2", &[closure("CAT", 10)]).unwrap();
        assert_eq!(store.position_history("CAT").unwrap(), PositionHistory::default());

        store.append_trades("r3", &[trade("CAT", 12)]).unwrap();
        assert_eq!(
            store.position_history("CAT").unwrap().entry_date,
            NaiveDate::from_ymd_opt(2024, 2, 12)
        );
    }
}

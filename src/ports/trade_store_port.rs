//! Trade persistence port trait.

use crate::domain::error::TraderError;
use crate::domain::trade::{ClosedPositionRecord, PositionHistory, TradeRecord};

pub trait TradeStorePort {
    fn append_trades(&self, run_id: &str, trades: &[TradeRecord]) -> Result<(), TraderError>;

    fn append_closures(
        &self,
        run_id: &str,
        closures: &[ClosedPositionRecord],
    ) -> Result<(), TraderError>;

    /// Entry date of the most recent open trade and the stored profit peak.
    fn position_history(&self, symbol: &str) -> Result<PositionHistory, TraderError>;

    /// Raises the stored peak for `symbol` to `plpc_pct` if it is higher.
    fn record_peak(&self, symbol: &str, plpc_pct: f64) -> Result<(), TraderError>;
}

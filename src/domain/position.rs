//! Broker-owned open positions.

/// An open position as reported by the broker.
///
/// `unrealized_plpc` is a fraction: 0.05 means five percent.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub qty: f64,
    pub avg_entry_price: f64,
    pub current_price: f64,
    pub unrealized_plpc: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.qty > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.qty < 0.0
    }

    /// Unrealized profit and loss in percent.
    pub fn plpc_pct(&self) -> f64 {
        self.unrealized_plpc * 100.0
    }

    pub fn market_value(&self) -> f64 {
        self.qty.abs() * self.current_price
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.qty * (self.current_price - self.avg_entry_price)
    }

    /// Position with `unrealized_plpc` derived from the two prices.
    pub fn from_prices(symbol: impl Into<String>, qty: f64, avg_entry_price: f64, current_price: f64) -> Self {
        let unrealized_plpc = if avg_entry_price > 0.0 {
            let raw = current_price / avg_entry_price - 1.0;
            if qty < 0.0 { -raw } else { raw }
        } else {
            0.0
        };
        Self {
            symbol: symbol.into(),
            qty,
            avg_entry_price,
            current_price,
            unrealized_plpc,
        }
    }
}

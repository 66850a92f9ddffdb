//! In-memory paper broker.
//!
//! Orders are accepted and recorded but never filled; positions and buying
//! power stay as configured for the whole run.

use crate::domain::error::TraderError;
use crate::domain::position::Position;
use crate::ports::broker_port::{Account, BrokerPort, OrderRequest};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PositionRow {
    symbol: String,
    qty: f64,
    avg_entry_price: f64,
    current_price: f64,
}

/// Reads `symbol,qty,avg_entry_price,current_price` rows.
pub fn load_positions_csv(path: &Path) -> Result<Vec<Position>, TraderError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| TraderError::Database {
        reason: format!("failed to open {}: {}", path.display(), e),
    })?;
    rdr.deserialize::<PositionRow>()
        .map(|row| {
            let row = row.map_err(|e| TraderError::Database {
                reason: format!("{}: {}", path.display(), e),
            })?;
            Ok(Position::from_prices(
                row.symbol.trim().to_uppercase(),
                row.qty,
                row.avg_entry_price,
                row.current_price,
            ))
        })
        .collect()
}

pub struct PaperBroker {
    buying_power: f64,
    positions: Vec<Position>,
    rejected: HashSet<String>,
    orders: RefCell<Vec<OrderRequest>>,
}

impl PaperBroker {
    pub fn new(buying_power: f64) -> Self {
        Self {
            buying_power,
            positions: Vec::new(),
            rejected: HashSet::new(),
            orders: RefCell::new(Vec::new()),
        }
    }

    pub fn with_positions(mut self, positions: Vec<Position>) -> Self {
        self.positions = positions;
        self
    }

    /// Every order for `symbol` will fail with `OrderRejected`.
    pub fn reject_symbol(mut self, symbol: &str) -> Self {
        self.rejected.insert(symbol.to_uppercase());
        self
    }

    /// Accepted orders, in submission order.
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.borrow().clone()
    }
}

impl BrokerPort for PaperBroker {
    fn get_account(&self) -> Result<Account, TraderError> {
        Ok(Account {
            buying_power: self.buying_power,
        })
    }

    fn list_positions(&self) -> Result<Vec<Position>, TraderError> {
        Ok(self.positions.clone())
    }

    fn submit_order(&self, order: &OrderRequest) -> Result<String, TraderError> {
        if self.rejected.contains(&order.symbol.to_uppercase()) {
            return Err(TraderError::OrderRejected {
                symbol: order.symbol.clone(),
                reason: "symbol not tradable".into(),
            });
        }
        if !(order.qty > 0.0) {
            return Err(TraderError::OrderRejected {
                symbol: order.symbol.clone(),
                reason: format!("quantity must be positive, got {}", order.qty),
            });
        }
        let mut orders = self.orders.borrow_mut();
        orders.push(order.clone());
        let id = format!("paper-{:05}", orders.len());
        tracing::info!(
            symbol = %order.symbol,
            side = %order.side,
            qty = order.qty,
            order_id = %id,
            "paper order accepted"
        );
        Ok(id)
    }
}

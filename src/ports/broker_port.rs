//! Broker gateway port trait.

use crate::domain::error::TraderError;
use crate::domain::position::Position;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Account {
    pub buying_power: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("buy"),
            OrderSide::Sell => f.write_str("sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    Day,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: f64,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    /// A market order valid for the current session.
    pub fn market_day(symbol: &str, qty: f64, side: OrderSide) -> Self {
        Self {
            symbol: symbol.to_string(),
            qty,
            side,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
        }
    }
}

pub trait BrokerPort {
    fn get_account(&self) -> Result<Account, TraderError>;

    fn list_positions(&self) -> Result<Vec<Position>, TraderError>;

    /// Submits an order and returns the broker's order id. Fills are not tracked.
    fn submit_order(&self, order: &OrderRequest) -> Result<String, TraderError>;
}

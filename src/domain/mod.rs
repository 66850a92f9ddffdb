//! Core domain types and logic.

pub mod ohlcv;
pub mod position;
pub mod indicator;
pub mod sector;
pub mod sector_table;
pub mod regime;
pub mod market_context;
pub mod signal;
pub mod scoring;
pub mod balancer;
pub mod sizing;
pub mod exit;
pub mod simulator;
pub mod metrics;
pub mod trade;
pub mod universe;
pub mod retry;
pub mod cycle;
pub mod config;
pub mod config_validation;
pub mod error;

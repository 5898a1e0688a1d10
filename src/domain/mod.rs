//! Core domain types and logic.

pub mod ohlcv;
pub mod symbol_data;
pub mod trade;
pub mod cost;
pub mod tax;
pub mod position;
pub mod portfolio;
pub mod indicator;
pub mod strategy;
pub mod strategies;
pub mod sizing;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;

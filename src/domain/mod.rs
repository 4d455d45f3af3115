//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod stock_data;
pub mod strategy;
pub mod execution;
pub mod trade;
pub mod portfolio;
pub mod metrics;
pub mod backtest;
pub mod compatibility;
pub mod proximity;
pub mod results;
pub mod universe;
pub mod throttle;
pub mod batch;
pub mod publish;
pub mod schedule;
pub mod config_validation;
pub mod error;

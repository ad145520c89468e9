//! Core domain types and logic.

pub mod analyzer;
pub mod backtest;
pub mod broker;
pub mod config_validation;
pub mod equity;
pub mod error;
pub mod holding;
pub mod price;
pub mod rebalance;
pub mod transaction;
pub mod universe;

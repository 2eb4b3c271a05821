//! EWMA Crossover Backtester
//!
//! Backtests a dual-exponential-smoothing crossover strategy over a price
//! series, optionally gated by a macroeconomic bias signal, and selects
//! the best smoothing parameters via parallel grid search scored by
//! Sharpe ratio.

pub mod config;
pub mod data;
pub mod indicators;
pub mod metrics;
pub mod optimize;
pub mod simulator;
pub mod types;

pub use config::Config;
pub use types::*;

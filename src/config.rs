//! Configuration management
//!
//! JSON configuration file supplying defaults for the backtest and
//! optimize commands; CLI flags override individual fields.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }
}

/// Input data sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV with (date, close) rows
    pub price_csv: String,
    /// Optional CSV with (date, signal) rows; enables macro gating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_csv: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            price_csv: "data/prices.csv".to_string(),
            macro_csv: None,
        }
    }
}

/// Strategy parameters shared by every simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Crossover threshold for entry signals
    pub threshold: f64,
    /// Deceleration rate for exit signals
    pub decel_rate: f64,
    /// Starting capital, same currency as the price data
    pub initial_capital: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            threshold: 0.001,
            decel_rate: 0.0005,
            initial_capital: 10_000.0,
        }
    }
}

/// Grid search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Step size for the alpha/beta grid, in (0, 1)
    pub step: f64,
    /// Number of top-scored pairs to report
    pub top: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            step: 0.05,
            top: 10,
        }
    }
}

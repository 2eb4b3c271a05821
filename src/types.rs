//! Core data types used across the backtester

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the simulator, metrics calculator, and optimizer
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("insufficient data: need at least 3 bars, got {0}")]
    InsufficientData(usize),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid time span: equity curve first and last timestamps are identical")]
    InvalidTimeSpan,

    #[error("grid search produced no scored parameter pair")]
    EmptyGrid,
}

/// Validation errors for price series construction
#[derive(Debug, Error)]
pub enum PriceSeriesError {
    #[error("timestamps must be strictly increasing: bar {index} ({current}) is not after {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("close price at bar {index} must be positive and finite, got {close}")]
    InvalidClose { index: usize, close: f64 },
}

/// A single (timestamp, close) observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub datetime: DateTime<Utc>,
    pub close: f64,
}

/// Ordered close-price series, validated on construction.
///
/// Timestamps are strictly increasing and closes are positive and finite.
/// Immutable once built; simulation runs never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries(Vec<PricePoint>);

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, PriceSeriesError> {
        for (index, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(PriceSeriesError::InvalidClose {
                    index,
                    close: point.close,
                });
            }
            if index > 0 && point.datetime <= points[index - 1].datetime {
                return Err(PriceSeriesError::NonIncreasingTimestamp {
                    index,
                    previous: points[index - 1].datetime,
                    current: point.datetime,
                });
            }
        }
        Ok(PriceSeries(points))
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.0.iter().map(|p| p.close).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.0.iter().map(|p| p.datetime).collect()
    }
}

/// A single macro observation; `signal` is +1 (bullish) or -1 (bearish)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroPoint {
    pub datetime: DateTime<Utc>,
    pub signal: i8,
}

/// Position held by the state machine, one unit of exposure at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Flat,
    Long,
    Short,
}

/// Trade record kind.
///
/// `Buy`/`Sell` open a position (and reverse an opposite one in place);
/// `ExitLong`/`ExitShort` are deceleration exits back to flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    Buy,
    Sell,
    ExitLong,
    ExitShort,
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TradeKind::Buy => "Buy",
            TradeKind::Sell => "Sell",
            TradeKind::ExitLong => "Exit Long",
            TradeKind::ExitShort => "Exit Short",
        };
        write!(f, "{}", label)
    }
}

/// Immutable trade log entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub datetime: DateTime<Utc>,
    pub kind: TradeKind,
    pub price: f64,
}

/// A scored (alpha, beta) grid cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterScore {
    pub alpha: f64,
    pub beta: f64,
    pub sharpe: f64,
}

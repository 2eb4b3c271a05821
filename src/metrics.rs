//! Performance metrics
//!
//! Turns an equity curve and a realized trade PnL list into the fixed set
//! of statistics the optimizer scores on. Every division-by-zero hazard
//! resolves to an explicit zero default rather than an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::StrategyError;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;

/// Fixed statistics map computed from one simulation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    /// Peak-to-trough decline as a fraction of the peak; non-positive
    pub max_drawdown: f64,
    pub hit_rate: f64,
    /// Count of PnL entries passed in. The no-trade zero placeholder
    /// counts, so callers see 1 here for a run with no realized trades.
    pub total_trades: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub win_loss_ratio: f64,
}

/// Compute performance statistics from an equity curve and realized PnLs.
///
/// The equity curve must have at least two points with distinct first and
/// last timestamps; `trade_pnls` must be non-empty (the simulator pads a
/// zero placeholder when no trade realized).
pub fn calculate_metrics(
    equity_curve: &[(DateTime<Utc>, f64)],
    trade_pnls: &[f64],
) -> Result<PerformanceMetrics, StrategyError> {
    if equity_curve.len() < 2 {
        return Err(StrategyError::InsufficientData(equity_curve.len()));
    }

    let (first_ts, first_equity) = equity_curve[0];
    let (last_ts, last_equity) = *equity_curve.last().unwrap();
    if first_ts == last_ts {
        return Err(StrategyError::InvalidTimeSpan);
    }

    let total_return = last_equity / first_equity - 1.0;
    let elapsed_days = (last_ts - first_ts).num_days().max(1) as f64;
    let annual_return =
        (1.0 + total_return).powf(CALENDAR_DAYS_PER_YEAR / elapsed_days) - 1.0;

    // Per-step pct-change returns; the first point has no prior bar
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| (w[1].1 - w[0].1) / w[0].1)
        .collect();

    // Sample stdev; undefined for a single observation, treated as zero
    let std_dev = Statistics::std_dev(&returns);
    let mean_return = Statistics::mean(&returns);

    let (annual_volatility, sharpe_ratio) = if std_dev.is_finite() && std_dev > 0.0 {
        (
            std_dev * TRADING_DAYS_PER_YEAR.sqrt(),
            mean_return / std_dev * TRADING_DAYS_PER_YEAR.sqrt(),
        )
    } else {
        (0.0, 0.0)
    };

    // Max drawdown against the running equity peak
    let mut peak = first_equity;
    let mut max_drawdown = 0.0_f64;
    for &(_, equity) in equity_curve {
        if equity > peak {
            peak = equity;
        }
        let drawdown = (equity - peak) / peak;
        if drawdown < max_drawdown {
            max_drawdown = drawdown;
        }
    }

    let winners: Vec<f64> = trade_pnls.iter().copied().filter(|&p| p > 0.0).collect();
    let losers: Vec<f64> = trade_pnls.iter().copied().filter(|&p| p < 0.0).collect();

    let hit_rate = if trade_pnls.is_empty() {
        0.0
    } else {
        winners.len() as f64 / trade_pnls.len() as f64
    };

    let avg_win = if winners.is_empty() {
        0.0
    } else {
        Statistics::mean(&winners)
    };
    let avg_loss = if losers.is_empty() {
        0.0
    } else {
        Statistics::mean(&losers)
    };

    let win_loss_ratio = if avg_loss == 0.0 {
        0.0
    } else {
        avg_win / avg_loss.abs()
    };

    Ok(PerformanceMetrics {
        total_return,
        annual_return,
        annual_volatility,
        sharpe_ratio,
        max_drawdown,
        hit_rate,
        total_trades: trade_pnls.len(),
        avg_win,
        avg_loss,
        win_loss_ratio,
    })
}

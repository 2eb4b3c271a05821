//! Signal and position simulator
//!
//! Runs the crossover strategy bar by bar over a price series for one
//! (alpha, beta) pair. The bar loop is an explicit fold over a pure step
//! function so the state machine is testable on its own: mark-to-market is
//! applied with the position held entering the bar, then `step` evaluates
//! the deceleration exit followed by the entry check. An exit goes flat
//! first, so an entry may fire on the same bar. A Buy while short (or Sell
//! while long) realizes the opposite side's PnL and reverses in place with
//! no separate exit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::IndicatorFrame;
use crate::metrics::{calculate_metrics, PerformanceMetrics};
use crate::{Position, PriceSeries, StrategyError, Trade, TradeKind};

/// Parameters for a single simulation run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimParams {
    /// Slow smoothing factor, in (0, 1)
    pub alpha: f64,
    /// Fast smoothing factor, in (0, 1), strictly greater than alpha
    pub beta: f64,
    /// Crossover threshold for entries, >= 0
    pub threshold: f64,
    /// Deceleration magnitude for exits, >= 0
    pub decel_rate: f64,
    /// Starting account value, > 0
    pub initial_capital: f64,
}

impl SimParams {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(StrategyError::InvalidParameter(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(StrategyError::InvalidParameter(format!(
                "beta must be in (0, 1), got {}",
                self.beta
            )));
        }
        if self.alpha >= self.beta {
            return Err(StrategyError::InvalidParameter(format!(
                "alpha ({}) must be < beta ({}) so the fast series reacts faster",
                self.alpha, self.beta
            )));
        }
        if !(self.threshold >= 0.0) {
            return Err(StrategyError::InvalidParameter(format!(
                "threshold must be >= 0, got {}",
                self.threshold
            )));
        }
        if !(self.decel_rate >= 0.0) {
            return Err(StrategyError::InvalidParameter(format!(
                "deceleration rate must be >= 0, got {}",
                self.decel_rate
            )));
        }
        if !(self.initial_capital > 0.0) {
            return Err(StrategyError::InvalidParameter(format!(
                "initial capital must be > 0, got {}",
                self.initial_capital
            )));
        }
        Ok(())
    }
}

/// State carried between bars: the held position and its entry price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimState {
    pub position: Position,
    pub entry_price: f64,
}

impl SimState {
    pub fn flat() -> Self {
        SimState {
            position: Position::Flat,
            entry_price: 0.0,
        }
    }
}

/// Everything the step function sees for one bar
#[derive(Debug, Clone, Copy)]
pub struct BarContext {
    pub datetime: DateTime<Utc>,
    pub price: f64,
    pub prev_diff: f64,
    pub diff: f64,
    pub acceleration: Option<f64>,
    /// `None` disables macro gating; `Some(s)` requires s > 0 for longs
    /// and s < 0 for shorts
    pub macro_signal: Option<i8>,
}

/// Trades and realized PnLs emitted by one step, plus the next state
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub state: SimState,
    pub trades: Vec<Trade>,
    pub realized: Vec<f64>,
}

/// Pure transition function: exit check first, then entry check.
pub fn step(state: SimState, bar: &BarContext, params: &SimParams) -> StepOutput {
    let mut state = state;
    let mut trades = Vec::new();
    let mut realized = Vec::new();

    // Deceleration exit
    if let Some(accel) = bar.acceleration {
        match state.position {
            Position::Long if accel < -params.decel_rate => {
                realized.push(bar.price - state.entry_price);
                trades.push(Trade {
                    datetime: bar.datetime,
                    kind: TradeKind::ExitLong,
                    price: bar.price,
                });
                state = SimState::flat();
            }
            Position::Short if accel > params.decel_rate => {
                realized.push(state.entry_price - bar.price);
                trades.push(Trade {
                    datetime: bar.datetime,
                    kind: TradeKind::ExitShort,
                    price: bar.price,
                });
                state = SimState::flat();
            }
            _ => {}
        }
    }

    // Entry; conditions are mutually exclusive for threshold >= 0
    let long_crossover = bar.prev_diff < 0.0 && bar.diff > params.threshold;
    let short_crossover = bar.prev_diff > 0.0 && bar.diff < -params.threshold;

    if long_crossover && bar.macro_signal.map_or(true, |s| s > 0) {
        if state.position == Position::Short {
            realized.push(state.entry_price - bar.price);
        }
        trades.push(Trade {
            datetime: bar.datetime,
            kind: TradeKind::Buy,
            price: bar.price,
        });
        state = SimState {
            position: Position::Long,
            entry_price: bar.price,
        };
    } else if short_crossover && bar.macro_signal.map_or(true, |s| s < 0) {
        if state.position == Position::Long {
            realized.push(bar.price - state.entry_price);
        }
        trades.push(Trade {
            datetime: bar.datetime,
            kind: TradeKind::Sell,
            price: bar.price,
        });
        state = SimState {
            position: Position::Short,
            entry_price: bar.price,
        };
    }

    StepOutput {
        state,
        trades,
        realized,
    }
}

/// Full output of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub equity_curve: Vec<(DateTime<Utc>, f64)>,
    pub trades: Vec<Trade>,
    /// Realized PnLs in close order; a single 0.0 placeholder when no
    /// trade realized, so downstream statistics stay well-defined
    pub realized_pnl: Vec<f64>,
    pub indicators: IndicatorFrame,
    pub metrics: PerformanceMetrics,
}

/// Run the strategy over `series` for one parameter pair.
///
/// `macro_signals`, when present, must already be forward-filled onto the
/// series timestamps (one entry per bar); `None` disables macro gating.
/// The last open position, if any, is left open and excluded from the
/// realized PnL list.
pub fn run_simulation(
    series: &PriceSeries,
    params: &SimParams,
    macro_signals: Option<&[i8]>,
) -> Result<SimulationResult, StrategyError> {
    params.validate()?;
    if series.len() < 3 {
        return Err(StrategyError::InsufficientData(series.len()));
    }
    if let Some(signals) = macro_signals {
        if signals.len() != series.len() {
            return Err(StrategyError::InvalidParameter(format!(
                "macro series length ({}) does not match price series length ({})",
                signals.len(),
                series.len()
            )));
        }
    }

    let points = series.points();
    let closes = series.closes();
    let indicators = IndicatorFrame::compute(&closes, params.alpha, params.beta);

    let mut equity_curve: Vec<(DateTime<Utc>, f64)> = points
        .iter()
        .map(|p| (p.datetime, params.initial_capital))
        .collect();

    let mut state = SimState::flat();
    let mut trades = Vec::new();
    let mut realized_pnl = Vec::new();

    // Transitions start at the third bar so two prior diffs exist
    for i in 2..points.len() {
        let price = points[i].close;
        let prev_price = points[i - 1].close;
        let pct_change = (price - prev_price) / prev_price;

        // Mark-to-market with the position held entering the bar
        let prev_equity = equity_curve[i - 1].1;
        equity_curve[i].1 = match state.position {
            Position::Long => prev_equity * (1.0 + pct_change),
            Position::Short => prev_equity * (1.0 - pct_change),
            Position::Flat => prev_equity,
        };

        let bar = BarContext {
            datetime: points[i].datetime,
            price,
            prev_diff: indicators.diff[i - 1],
            diff: indicators.diff[i],
            acceleration: indicators.acceleration[i],
            macro_signal: macro_signals.map(|signals| signals[i]),
        };

        let output = step(state, &bar, params);
        for trade in &output.trades {
            debug!(
                kind = %trade.kind,
                price = trade.price,
                date = %trade.datetime.date_naive(),
                "trade"
            );
        }
        trades.extend(output.trades);
        realized_pnl.extend(output.realized);
        state = output.state;
    }

    if realized_pnl.is_empty() {
        realized_pnl.push(0.0);
    }

    let metrics = calculate_metrics(&equity_curve, &realized_pnl)?;

    Ok(SimulationResult {
        equity_curve,
        trades,
        realized_pnl,
        indicators,
        metrics,
    })
}

//! Grid search optimization
//!
//! Enumerates valid (alpha, beta) pairs over a discretized range, scores
//! each with a full simulation run, and selects the pair with the highest
//! Sharpe ratio. Cells are evaluated in parallel with Rayon; best-pair
//! selection is a single sequential reduction over the ordered result set
//! so ties deterministically keep the first pair in enumeration order
//! (alpha ascending, then beta ascending) regardless of worker scheduling.

use indicatif::ProgressBar;
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::simulator::{run_simulation, SimParams, SimulationResult};
use crate::{ParameterScore, PriceSeries, StrategyError};

/// Guard so a multiple of the step that is exactly 1 in real arithmetic is
/// excluded even when float rounding lands it just below 1.0 (10 * 0.1).
const GRID_EPSILON: f64 = 1e-9;

/// Smoothing factor candidates: {s, 2s, 3s, ...} strictly below 1.
/// A step outside (0, 1) yields no candidates.
pub fn grid_values(step: f64) -> Vec<f64> {
    if !(step > 0.0 && step < 1.0) {
        return Vec::new();
    }
    (1..)
        .map(|i| i as f64 * step)
        .take_while(|v| *v < 1.0 - GRID_EPSILON)
        .collect()
}

/// Index pairs (i, j) with i < j into the grid values, enumerated alpha
/// ascending then beta ascending. Retains exactly the alpha < beta cells.
fn index_pairs(count: usize) -> Vec<(usize, usize)> {
    (0..count).tuple_combinations().collect()
}

/// Valid (alpha, beta) pairs for a step size, in enumeration order
pub fn parameter_pairs(step: f64) -> Vec<(f64, f64)> {
    let values = grid_values(step);
    index_pairs(values.len())
        .into_iter()
        .map(|(i, j)| (values[i], values[j]))
        .collect()
}

/// Rectangular Sharpe matrix keyed by alpha (rows) and beta (columns).
/// Cells with alpha >= beta, and cells whose simulation failed, are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreMatrix {
    pub alphas: Vec<f64>,
    pub betas: Vec<f64>,
    cells: Vec<Vec<Option<f64>>>,
}

impl ScoreMatrix {
    fn new(values: &[f64]) -> Self {
        ScoreMatrix {
            alphas: values.to_vec(),
            betas: values.to_vec(),
            cells: vec![vec![None; values.len()]; values.len()],
        }
    }

    pub fn get(&self, alpha_idx: usize, beta_idx: usize) -> Option<f64> {
        self.cells[alpha_idx][beta_idx]
    }
}

/// Full optimizer output for downstream display/export
#[derive(Debug, Clone)]
pub struct OptimizationReport {
    pub best: ParameterScore,
    /// Simulation re-run for the best pair: metrics, indicators, equity
    /// curve, and trade log
    pub best_run: SimulationResult,
    /// All successfully scored pairs in enumeration order
    pub scores: Vec<ParameterScore>,
    pub matrix: ScoreMatrix,
}

/// Exhaustive (alpha, beta) grid search scored by Sharpe ratio
#[derive(Debug, Clone, Copy)]
pub struct GridSearch {
    pub threshold: f64,
    pub decel_rate: f64,
    pub initial_capital: f64,
    pub step: f64,
}

impl GridSearch {
    fn params_for(&self, alpha: f64, beta: f64) -> SimParams {
        SimParams {
            alpha,
            beta,
            threshold: self.threshold,
            decel_rate: self.decel_rate,
            initial_capital: self.initial_capital,
        }
    }

    fn validate(&self) -> Result<(), StrategyError> {
        if !(self.step > 0.0 && self.step < 1.0) {
            return Err(StrategyError::InvalidParameter(format!(
                "grid step must be in (0, 1), got {}",
                self.step
            )));
        }
        Ok(())
    }

    /// Score one grid cell; a failed or non-finite cell becomes `None`
    /// and never aborts the whole grid.
    fn evaluate_cell(
        &self,
        series: &PriceSeries,
        macro_signals: Option<&[i8]>,
        alpha: f64,
        beta: f64,
    ) -> Option<f64> {
        match run_simulation(series, &self.params_for(alpha, beta), macro_signals) {
            Ok(result) => {
                let sharpe = result.metrics.sharpe_ratio;
                if sharpe.is_finite() {
                    Some(sharpe)
                } else {
                    warn!(alpha, beta, sharpe, "grid cell produced non-finite score");
                    None
                }
            }
            Err(err) => {
                warn!(alpha, beta, error = %err, "grid cell failed");
                None
            }
        }
    }

    /// Run the grid search with parallel cell evaluation
    pub fn run(
        &self,
        series: &PriceSeries,
        macro_signals: Option<&[i8]>,
    ) -> Result<OptimizationReport, StrategyError> {
        self.run_with_progress(series, macro_signals, None)
    }

    /// Parallel run, optionally incrementing a progress bar per cell
    pub fn run_with_progress(
        &self,
        series: &PriceSeries,
        macro_signals: Option<&[i8]>,
        progress: Option<&ProgressBar>,
    ) -> Result<OptimizationReport, StrategyError> {
        self.validate()?;
        let values = grid_values(self.step);
        let pairs = index_pairs(values.len());
        info!(
            step = self.step,
            cells = pairs.len(),
            "scanning parameter grid"
        );

        let cell_scores: Vec<Option<f64>> = pairs
            .par_iter()
            .map(|&(i, j)| {
                let score = self.evaluate_cell(series, macro_signals, values[i], values[j]);
                if let Some(bar) = progress {
                    bar.inc(1);
                }
                score
            })
            .collect();

        self.reduce(series, macro_signals, &values, &pairs, &cell_scores)
    }

    /// Sequential run, for debugging and reproducing parallel results
    pub fn run_sequential(
        &self,
        series: &PriceSeries,
        macro_signals: Option<&[i8]>,
    ) -> Result<OptimizationReport, StrategyError> {
        self.validate()?;
        let values = grid_values(self.step);
        let pairs = index_pairs(values.len());
        info!(
            step = self.step,
            cells = pairs.len(),
            "scanning parameter grid sequentially"
        );

        let cell_scores: Vec<Option<f64>> = pairs
            .iter()
            .map(|&(i, j)| self.evaluate_cell(series, macro_signals, values[i], values[j]))
            .collect();

        self.reduce(series, macro_signals, &values, &pairs, &cell_scores)
    }

    /// Deterministic reduction over the full ordered result set. Ties keep
    /// the first pair found (strict `>` comparison).
    fn reduce(
        &self,
        series: &PriceSeries,
        macro_signals: Option<&[i8]>,
        values: &[f64],
        pairs: &[(usize, usize)],
        cell_scores: &[Option<f64>],
    ) -> Result<OptimizationReport, StrategyError> {
        let mut matrix = ScoreMatrix::new(values);
        let mut scores = Vec::new();
        let mut best: Option<ParameterScore> = None;

        for (&(i, j), &cell) in pairs.iter().zip(cell_scores) {
            let Some(sharpe) = cell else { continue };
            matrix.cells[i][j] = Some(sharpe);
            let candidate = ParameterScore {
                alpha: values[i],
                beta: values[j],
                sharpe,
            };
            scores.push(candidate);
            if best.map_or(true, |b| sharpe > b.sharpe) {
                best = Some(candidate);
            }
        }

        let best = best.ok_or(StrategyError::EmptyGrid)?;
        info!(
            alpha = best.alpha,
            beta = best.beta,
            sharpe = best.sharpe,
            "grid search complete"
        );

        let best_run = run_simulation(
            series,
            &self.params_for(best.alpha, best.beta),
            macro_signals,
        )?;

        Ok(OptimizationReport {
            best,
            best_run,
            scores,
            matrix,
        })
    }
}

//! Optimize command implementation with progress tracking

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use ordered_float::OrderedFloat;
use tracing::info;

use ewma_crossover::data;
use ewma_crossover::optimize::{parameter_pairs, GridSearch};

use super::backtest::print_metrics;
use super::{load_config, load_inputs};

#[allow(clippy::too_many_arguments)]
pub fn run(
    config_path: Option<String>,
    data_path: Option<String>,
    macro_path: Option<String>,
    step: Option<f64>,
    threshold: Option<f64>,
    decel: Option<f64>,
    capital: Option<f64>,
    top: Option<usize>,
    matrix_out: Option<String>,
    trades_out: Option<String>,
    sequential: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let (series, macro_signals) = load_inputs(&config, data_path, macro_path)?;

    let search = GridSearch {
        threshold: threshold.unwrap_or(config.strategy.threshold),
        decel_rate: decel.unwrap_or(config.strategy.decel_rate),
        initial_capital: capital.unwrap_or(config.strategy.initial_capital),
        step: step.unwrap_or(config.optimizer.step),
    };
    let top = top.unwrap_or(config.optimizer.top);

    let cells = parameter_pairs(search.step).len();
    info!(
        step = search.step,
        cells,
        macro_enabled = macro_signals.is_some(),
        sequential,
        "starting grid search"
    );

    let report = if sequential {
        search.run_sequential(&series, macro_signals.as_deref())?
    } else {
        let progress = ProgressBar::new(cells as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} cells ({eta})")
                .unwrap()
                .progress_chars("#>-"),
        );
        let report =
            search.run_with_progress(&series, macro_signals.as_deref(), Some(&progress))?;
        progress.finish_with_message("done");
        report
    };

    println!(
        "\nBest parameters: alpha={:.2}, beta={:.2} (Sharpe {:.3})",
        report.best.alpha, report.best.beta, report.best.sharpe
    );
    print_metrics(&report.best_run.metrics);

    // Top-N pairs under a total order so NaN can never poison the sort
    let mut ranked = report.scores.clone();
    ranked.sort_by_key(|s| std::cmp::Reverse(OrderedFloat(s.sharpe)));

    println!("\n=== Top {} pairs ===", top.min(ranked.len()));
    println!("{:>6} {:>6} {:>10}", "alpha", "beta", "sharpe");
    for score in ranked.iter().take(top) {
        println!(
            "{:>6.2} {:>6.2} {:>10.3}",
            score.alpha, score.beta, score.sharpe
        );
    }

    if let Some(path) = matrix_out {
        data::write_score_matrix_csv(&path, &report.matrix)?;
        println!("\nScore matrix written to {}", path);
    }

    if let Some(path) = trades_out {
        data::write_trades_csv(&path, &report.best_run.trades)?;
        println!("Best-pair trade log written to {}", path);
    }

    Ok(())
}

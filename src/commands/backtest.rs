//! Backtest command implementation

use anyhow::Result;
use tracing::info;

use ewma_crossover::metrics::PerformanceMetrics;
use ewma_crossover::simulator::{run_simulation, SimParams};
use ewma_crossover::data;

use super::{load_config, load_inputs};

pub fn print_metrics(metrics: &PerformanceMetrics) {
    println!("\n=== Performance Metrics ===");
    println!("Total Return:      {:>10.2}%", metrics.total_return * 100.0);
    println!("Annual Return:     {:>10.2}%", metrics.annual_return * 100.0);
    println!("Annual Volatility: {:>10.2}%", metrics.annual_volatility * 100.0);
    println!("Sharpe Ratio:      {:>10.3}", metrics.sharpe_ratio);
    println!("Max Drawdown:      {:>10.2}%", metrics.max_drawdown * 100.0);
    println!("Hit Rate:          {:>10.2}%", metrics.hit_rate * 100.0);
    println!("Total Trades:      {:>10}", metrics.total_trades);
    println!("Avg Win:           {:>10.4}", metrics.avg_win);
    println!("Avg Loss:          {:>10.4}", metrics.avg_loss);
    println!("Win/Loss Ratio:    {:>10.3}", metrics.win_loss_ratio);
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    config_path: Option<String>,
    data_path: Option<String>,
    macro_path: Option<String>,
    alpha: f64,
    beta: f64,
    threshold: Option<f64>,
    decel: Option<f64>,
    capital: Option<f64>,
    trades_out: Option<String>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let (series, macro_signals) = load_inputs(&config, data_path, macro_path)?;

    let params = SimParams {
        alpha,
        beta,
        threshold: threshold.unwrap_or(config.strategy.threshold),
        decel_rate: decel.unwrap_or(config.strategy.decel_rate),
        initial_capital: capital.unwrap_or(config.strategy.initial_capital),
    };

    info!(
        alpha,
        beta,
        threshold = params.threshold,
        decel_rate = params.decel_rate,
        macro_enabled = macro_signals.is_some(),
        "running backtest"
    );

    let result = run_simulation(&series, &params, macro_signals.as_deref())?;

    println!("\nBacktest: alpha={:.2}, beta={:.2} over {} bars", alpha, beta, series.len());
    print_metrics(&result.metrics);

    println!("\n=== Trade Log ({} entries) ===", result.trades.len());
    for trade in &result.trades {
        println!(
            "{}  {:<10}  {:.6}",
            trade.datetime.date_naive(),
            trade.kind.to_string(),
            trade.price
        );
    }

    if let Some(path) = trades_out {
        data::write_trades_csv(&path, &result.trades)?;
        println!("\nTrade log written to {}", path);
    }

    Ok(())
}

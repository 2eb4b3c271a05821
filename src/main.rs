//! EWMA crossover backtester - main entry point
//!
//! This binary provides two subcommands:
//! - backtest: Run a single (alpha, beta) simulation
//! - optimize: Grid-search alpha/beta for the best Sharpe ratio

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "ewma-crossover")]
#[command(about = "Dual exponential smoothing crossover backtester with grid-search optimization", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single-pair backtest
    Backtest {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Price CSV with (date, close) rows (overrides config)
        #[arg(long)]
        data: Option<String>,

        /// Macro CSV with (date, signal) rows; enables macro gating
        #[arg(long = "macro")]
        macro_csv: Option<String>,

        /// Slow smoothing factor, in (0, 1)
        #[arg(long)]
        alpha: f64,

        /// Fast smoothing factor, in (0, 1), must exceed alpha
        #[arg(long)]
        beta: f64,

        /// Crossover threshold (overrides config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Deceleration exit rate (overrides config)
        #[arg(long)]
        decel: Option<f64>,

        /// Initial capital (overrides config)
        #[arg(long)]
        capital: Option<f64>,

        /// Write the trade log to this CSV path
        #[arg(long)]
        trades_out: Option<String>,
    },

    /// Optimize alpha/beta over a parameter grid
    Optimize {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Price CSV with (date, close) rows (overrides config)
        #[arg(long)]
        data: Option<String>,

        /// Macro CSV with (date, signal) rows; enables macro gating
        #[arg(long = "macro")]
        macro_csv: Option<String>,

        /// Grid step size, in (0, 1) (overrides config)
        #[arg(long)]
        step: Option<f64>,

        /// Crossover threshold (overrides config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Deceleration exit rate (overrides config)
        #[arg(long)]
        decel: Option<f64>,

        /// Initial capital (overrides config)
        #[arg(long)]
        capital: Option<f64>,

        /// Number of top results to show
        #[arg(short, long)]
        top: Option<usize>,

        /// Write the score matrix to this CSV path
        #[arg(long)]
        matrix_out: Option<String>,

        /// Write the best-pair trade log to this CSV path
        #[arg(long)]
        trades_out: Option<String>,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // For the optimizer: log to file only so the progress bar owns
        // the console
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(true);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Backtest { .. } => ("backtest", false),
        Commands::Optimize { .. } => ("optimize", true),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Backtest {
            config,
            data,
            macro_csv,
            alpha,
            beta,
            threshold,
            decel,
            capital,
            trades_out,
        } => commands::backtest::run(
            config, data, macro_csv, alpha, beta, threshold, decel, capital, trades_out,
        ),

        Commands::Optimize {
            config,
            data,
            macro_csv,
            step,
            threshold,
            decel,
            capital,
            top,
            matrix_out,
            trades_out,
            sequential,
        } => commands::optimize::run(
            config, data, macro_csv, step, threshold, decel, capital, top, matrix_out,
            trades_out, sequential,
        ),
    }
}

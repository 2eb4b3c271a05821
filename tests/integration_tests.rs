//! Integration tests for the ewma-crossover backtester
//!
//! These tests drive the simulator, metrics calculator, and grid search
//! optimizer together over synthetic price series.

use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};

use ewma_crossover::optimize::GridSearch;
use ewma_crossover::simulator::{run_simulation, SimParams};
use ewma_crossover::{PricePoint, PriceSeries, StrategyError, TradeKind};

// =============================================================================
// Test Utilities
// =============================================================================

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Build a daily series from explicit closes
fn series_from(closes: &[f64]) -> PriceSeries {
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            datetime: start_time() + Duration::days(i as i64),
            close,
        })
        .collect();
    PriceSeries::new(points).unwrap()
}

/// Constant price series
fn constant_series(count: usize, price: f64) -> PriceSeries {
    series_from(&vec![price; count])
}

/// Two-bar dip, then strictly increasing by 1% each bar. The dip pushes
/// the fast-minus-slow diff negative so the subsequent recovery produces
/// a genuine upward crossover.
fn dip_then_rally(count: usize) -> PriceSeries {
    let mut closes = vec![100.0, 97.0, 96.0];
    let mut price = 96.0;
    while closes.len() < count {
        price *= 1.01;
        closes.push(price);
    }
    series_from(&closes)
}

fn default_params() -> SimParams {
    SimParams {
        alpha: 0.1,
        beta: 0.3,
        threshold: 0.0001,
        decel_rate: 0.0005,
        initial_capital: 10_000.0,
    }
}

// =============================================================================
// Simulator Properties
// =============================================================================

#[test]
fn test_equity_curve_has_one_point_per_bar() {
    for count in [3, 10, 47] {
        let series = dip_then_rally(count);
        let result = run_simulation(&series, &default_params(), None).unwrap();
        assert_eq!(result.equity_curve.len(), count);
        assert_eq!(result.indicators.diff.len(), count);
    }
}

#[test]
fn test_equity_unchanged_while_flat() {
    // A threshold no crossover can reach keeps the run flat throughout
    let mut params = default_params();
    params.threshold = 1e9;
    let series = dip_then_rally(40);
    let result = run_simulation(&series, &params, None).unwrap();

    assert!(result.trades.is_empty());
    for &(_, equity) in &result.equity_curve {
        assert_relative_eq!(equity, params.initial_capital);
    }
}

#[test]
fn test_simulator_is_deterministic() {
    let series = dip_then_rally(60);
    let first = run_simulation(&series, &default_params(), None).unwrap();
    let second = run_simulation(&series, &default_params(), None).unwrap();

    assert_eq!(first.trades, second.trades);
    assert_eq!(first.equity_curve, second.equity_curve);
    assert_eq!(first.realized_pnl, second.realized_pnl);
}

#[test]
fn test_constant_price_run_never_trades() {
    // diff is identically zero, so no entry can fire; the zero-PnL
    // placeholder keeps the statistics well-defined
    let mut params = default_params();
    params.threshold = 0.001;
    let series = constant_series(10, 100.0);
    let result = run_simulation(&series, &params, None).unwrap();

    assert!(result.trades.is_empty());
    assert_eq!(result.realized_pnl, vec![0.0]);
    assert_eq!(result.metrics.total_trades, 1);
    assert_relative_eq!(result.metrics.hit_rate, 0.0);
    assert_relative_eq!(result.metrics.sharpe_ratio, 0.0);
    assert_relative_eq!(result.metrics.max_drawdown, 0.0);
}

#[test]
fn test_rally_goes_long_and_never_short() {
    let series = dip_then_rally(50);
    let result = run_simulation(&series, &default_params(), None).unwrap();

    let kinds: Vec<TradeKind> = result.trades.iter().map(|t| t.kind).collect();
    assert!(kinds.contains(&TradeKind::Buy), "expected a long entry, got {:?}", kinds);
    assert!(!kinds.contains(&TradeKind::Sell));
    assert!(!kinds.contains(&TradeKind::ExitShort));

    // Steady 1% bars never decelerate the fast EWMA, so the long rides to
    // the end and equity never decreases after the entry
    let entry_date = result
        .trades
        .iter()
        .find(|t| t.kind == TradeKind::Buy)
        .unwrap()
        .datetime;
    let mut prev_equity = None;
    for &(date, equity) in &result.equity_curve {
        if date > entry_date {
            if let Some(prev) = prev_equity {
                assert!(equity > prev, "equity fell from {} to {} on {}", prev, equity, date);
            }
        }
        prev_equity = Some(equity);
    }
    assert!(result.equity_curve.last().unwrap().1 > 10_000.0);
}

#[test]
fn test_bearish_macro_blocks_all_longs() {
    let series = dip_then_rally(50);

    // Without gating the crossover goes long
    let ungated = run_simulation(&series, &default_params(), None).unwrap();
    assert!(ungated.trades.iter().any(|t| t.kind == TradeKind::Buy));

    // A constantly bearish macro signal blocks every long entry
    let bearish = vec![-1_i8; series.len()];
    let gated = run_simulation(&series, &default_params(), Some(&bearish)).unwrap();
    assert!(gated.trades.iter().all(|t| t.kind != TradeKind::Buy));
    assert!(gated.trades.iter().all(|t| t.kind != TradeKind::ExitLong));
}

#[test]
fn test_neutral_macro_fallback_matches_bullish_gate_for_longs() {
    // The all-neutral (+1) fallback never blocks a long entry
    let series = dip_then_rally(50);
    let neutral = vec![1_i8; series.len()];
    let gated = run_simulation(&series, &default_params(), Some(&neutral)).unwrap();
    let ungated = run_simulation(&series, &default_params(), None).unwrap();

    let buys = |trades: &[ewma_crossover::Trade]| {
        trades
            .iter()
            .filter(|t| t.kind == TradeKind::Buy)
            .count()
    };
    assert_eq!(buys(&gated.trades), buys(&ungated.trades));
}

#[test]
fn test_open_position_left_unrealized() {
    // The rally run ends still long: realized PnLs only come from closes,
    // so a single never-closed entry leaves the placeholder in place
    let series = dip_then_rally(50);
    let result = run_simulation(&series, &default_params(), None).unwrap();

    let closes = result
        .trades
        .iter()
        .filter(|t| {
            matches!(
                t.kind,
                TradeKind::ExitLong | TradeKind::ExitShort
            )
        })
        .count();
    let entries = result.trades.len() - closes;
    assert!(entries >= 1);
    // One realized PnL per close plus reversals; the final open entry
    // contributes nothing
    assert!(result.realized_pnl.len() <= result.trades.len());
}

#[test]
fn test_invalid_parameters_rejected() {
    let series = dip_then_rally(20);

    let mut params = default_params();
    params.alpha = 0.5;
    params.beta = 0.3;
    assert!(matches!(
        run_simulation(&series, &params, None),
        Err(StrategyError::InvalidParameter(_))
    ));

    let mut params = default_params();
    params.initial_capital = 0.0;
    assert!(run_simulation(&series, &params, None).is_err());
}

#[test]
fn test_insufficient_data_rejected() {
    let series = series_from(&[100.0, 101.0]);
    assert!(matches!(
        run_simulation(&series, &default_params(), None),
        Err(StrategyError::InsufficientData(2))
    ));
}

// =============================================================================
// Grid Search
// =============================================================================

fn default_search(step: f64) -> GridSearch {
    GridSearch {
        threshold: 0.0001,
        decel_rate: 0.0005,
        initial_capital: 10_000.0,
        step,
    }
}

#[test]
fn test_grid_search_reports_best_and_matrix() {
    let series = dip_then_rally(60);
    let report = default_search(0.2).run(&series, None).unwrap();

    assert!(report.best.alpha < report.best.beta);
    assert!(report.best.sharpe.is_finite());

    // The matrix cell for the best pair carries the winning score
    let ai = report
        .matrix
        .alphas
        .iter()
        .position(|&a| (a - report.best.alpha).abs() < 1e-12)
        .unwrap();
    let bi = report
        .matrix
        .betas
        .iter()
        .position(|&b| (b - report.best.beta).abs() < 1e-12)
        .unwrap();
    assert_relative_eq!(report.matrix.get(ai, bi).unwrap(), report.best.sharpe);

    // Every scored pair is at most as good as the best
    for score in &report.scores {
        assert!(score.sharpe <= report.best.sharpe);
        assert!(score.alpha < score.beta);
    }
}

#[test]
fn test_tie_break_keeps_first_pair_in_enumeration_order() {
    // A constant price gives every pair an identical Sharpe of 0, so the
    // lexicographically first (alpha, beta) pair must win
    let series = constant_series(12, 100.0);
    let report = default_search(0.25).run(&series, None).unwrap();

    assert_relative_eq!(report.best.alpha, 0.25, epsilon = 1e-12);
    assert_relative_eq!(report.best.beta, 0.5, epsilon = 1e-12);
    assert_relative_eq!(report.best.sharpe, 0.0);
}

#[test]
fn test_parallel_and_sequential_agree() {
    let series = dip_then_rally(60);
    let search = default_search(0.2);
    let parallel = search.run(&series, None).unwrap();
    let sequential = search.run_sequential(&series, None).unwrap();

    assert_eq!(parallel.best.alpha, sequential.best.alpha);
    assert_eq!(parallel.best.beta, sequential.best.beta);
    assert_eq!(parallel.best.sharpe, sequential.best.sharpe);
    assert_eq!(parallel.scores.len(), sequential.scores.len());
}

#[test]
fn test_grid_with_no_valid_pair_is_an_error() {
    // step 0.5 leaves a single grid value and therefore no alpha < beta pair
    let series = dip_then_rally(20);
    assert!(matches!(
        default_search(0.5).run(&series, None),
        Err(StrategyError::EmptyGrid)
    ));
}

#[test]
fn test_grid_search_with_macro_gating_runs() {
    let series = dip_then_rally(60);
    let bearish = vec![-1_i8; series.len()];
    let report = default_search(0.25).run(&series, Some(&bearish)).unwrap();

    // Longs are blocked everywhere, so no best-pair run contains a Buy
    assert!(report
        .best_run
        .trades
        .iter()
        .all(|t| t.kind != TradeKind::Buy));
}

// =============================================================================
// State machine spot checks through the public API
// =============================================================================

#[test]
fn test_reversal_realizes_short_pnl() {
    // Down-crossover opens a short, later up-crossover reverses it; the
    // reversal must realize the short PnL without a separate exit record
    let closes = [
        100.0, 104.0, 106.0, 104.0, 100.0, 96.0, 92.0, 90.0, 89.0, 90.0, 94.0, 99.0,
        104.0, 108.0, 112.0,
    ];
    let series = series_from(&closes);
    let mut params = default_params();
    params.decel_rate = 1e9; // disable deceleration exits
    let result = run_simulation(&series, &params, None).unwrap();

    let kinds: Vec<TradeKind> = result.trades.iter().map(|t| t.kind).collect();
    assert!(kinds.contains(&TradeKind::Sell));
    assert!(kinds.contains(&TradeKind::Buy));
    assert!(!kinds.contains(&TradeKind::ExitShort));
    assert!(!kinds.contains(&TradeKind::ExitLong));

    // The lagging fast EWMA reverses the short above its entry, so its
    // realized PnL is entry minus reversal price: a loss
    assert_eq!(result.realized_pnl.len(), 1);
    assert!(result.realized_pnl[0] < 0.0);
}

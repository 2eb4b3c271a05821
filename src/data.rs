//! Data loading and export
//!
//! Loads (date, close) price CSVs and optional (date, signal) macro CSVs,
//! forward-fills the macro series onto the price timestamps, and writes
//! trade-log / score-matrix exports for downstream plotting tools.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;
use tracing::{info, warn};

use crate::optimize::ScoreMatrix;
use crate::{MacroPoint, PricePoint, PriceSeries, Trade};

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|d| {
                DateTime::<Utc>::from_naive_utc_and_offset(
                    d.and_hms_opt(0, 0, 0).unwrap(),
                    Utc,
                )
            })
        })
        .with_context(|| format!("Failed to parse datetime: {}", value))
}

/// Load a close-price series from a CSV with (date, close) columns.
/// The series is validated: strictly increasing timestamps, positive
/// finite closes.
pub fn load_price_csv(path: impl AsRef<Path>) -> Result<PriceSeries> {
    let mut reader =
        csv::Reader::from_path(path.as_ref()).context("Failed to open price CSV file")?;

    let mut points = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let dt_str = record.get(0).context("Missing date column")?;
        let datetime = parse_datetime(dt_str)?;

        let close: f64 = record
            .get(1)
            .context("Missing close column")?
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse close at row {}", row_idx + 1))?;

        points.push(PricePoint { datetime, close });
    }

    let series = PriceSeries::new(points).context("Price series failed validation")?;
    info!(bars = series.len(), path = %path.as_ref().display(), "loaded price series");
    Ok(series)
}

/// Load a macro bias series from a CSV with (date, signal) columns.
/// Signal values are normalized to their sign: positive becomes +1,
/// anything else -1.
pub fn load_macro_csv(path: impl AsRef<Path>) -> Result<Vec<MacroPoint>> {
    let mut reader =
        csv::Reader::from_path(path.as_ref()).context("Failed to open macro CSV file")?;

    let mut points = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let dt_str = record.get(0).context("Missing date column")?;
        let datetime = parse_datetime(dt_str)?;

        let raw: f64 = record
            .get(1)
            .context("Missing signal column")?
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse signal at row {}", row_idx + 1))?;

        let signal = if raw > 0.0 { 1 } else { -1 };
        points.push(MacroPoint { datetime, signal });
    }

    info!(points = points.len(), path = %path.as_ref().display(), "loaded macro series");
    Ok(points)
}

/// Forward-fill macro observations onto the price timestamps, one signal
/// per bar. Bars earlier than the first observation get +1 (neutral).
pub fn align_macro(series: &PriceSeries, macro_points: &[MacroPoint]) -> Vec<i8> {
    let mut aligned = Vec::with_capacity(series.len());
    let mut iter = macro_points.iter().peekable();
    let mut last_signal: i8 = 1;

    for point in series.points() {
        while let Some(next) = iter.peek() {
            if next.datetime <= point.datetime {
                last_signal = next.signal;
                iter.next();
            } else {
                break;
            }
        }
        aligned.push(last_signal);
    }

    aligned
}

/// Load and align a macro series, falling back to an all-neutral (+1)
/// series when the source is missing or unreadable. The fallback is
/// logged, never fatal, so macro confirmation simply stops blocking longs.
pub fn load_aligned_macro(path: impl AsRef<Path>, series: &PriceSeries) -> Vec<i8> {
    match load_macro_csv(path.as_ref()) {
        Ok(points) => align_macro(series, &points),
        Err(err) => {
            warn!(
                path = %path.as_ref().display(),
                error = %err,
                "macro source unavailable, falling back to neutral signal"
            );
            vec![1; series.len()]
        }
    }
}

/// Write the trade log as (date, type, price) rows
pub fn write_trades_csv(path: impl AsRef<Path>, trades: &[Trade]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path.as_ref()).context("Failed to create trades CSV file")?;
    writer.write_record(["date", "type", "price"])?;
    for trade in trades {
        writer.write_record([
            trade.datetime.date_naive().to_string(),
            trade.kind.to_string(),
            format!("{:.6}", trade.price),
        ])?;
    }
    writer.flush().context("Failed to flush trades CSV")?;
    info!(trades = trades.len(), path = %path.as_ref().display(), "wrote trade log");
    Ok(())
}

/// Write the score matrix as a rectangular table, alpha rows by beta
/// columns, empty cells where no score exists
pub fn write_score_matrix_csv(path: impl AsRef<Path>, matrix: &ScoreMatrix) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path.as_ref()).context("Failed to create matrix CSV file")?;

    let mut header = vec!["alpha".to_string()];
    header.extend(matrix.betas.iter().map(|b| format!("{:.2}", b)));
    writer.write_record(&header)?;

    for (i, alpha) in matrix.alphas.iter().enumerate() {
        let mut row = vec![format!("{:.2}", alpha)];
        for j in 0..matrix.betas.len() {
            row.push(match matrix.get(i, j) {
                Some(score) => format!("{:.6}", score),
                None => String::new(),
            });
        }
        writer.write_record(&row)?;
    }

    writer.flush().context("Failed to flush matrix CSV")?;
    info!(path = %path.as_ref().display(), "wrote score matrix");
    Ok(())
}

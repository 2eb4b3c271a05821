//! Exponential smoothing indicators
//!
//! The strategy is driven entirely by two exponentially weighted moving
//! averages of the close and their first and second differences.

use serde::{Deserialize, Serialize};

/// Exponentially weighted moving average with smoothing factor `factor`,
/// seeded with the first value: `e[t] = factor * x[t] + (1 - factor) * e[t-1]`.
pub fn ewma(values: &[f64], factor: f64) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());

    let mut prev = match values.first() {
        Some(&first) => first,
        None => return result,
    };
    result.push(prev);

    for &value in &values[1..] {
        prev = factor * value + (1.0 - factor) * prev;
        result.push(prev);
    }

    result
}

/// First finite difference; undefined for the first element
pub fn diff_series(values: &[f64]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());
    result.push(None);
    for window in values.windows(2) {
        result.push(Some(window[1] - window[0]));
    }
    result
}

/// Per-bar derived values for one (alpha, beta) pair.
///
/// `es_slow`/`es_fast` are EWMAs with factors alpha and beta, `diff` is
/// fast minus slow, `velocity` is the first difference of `es_fast` and
/// `acceleration` the second. Velocity is undefined on the first bar and
/// acceleration on the first two, hence `Option`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorFrame {
    pub es_slow: Vec<f64>,
    pub es_fast: Vec<f64>,
    pub diff: Vec<f64>,
    pub velocity: Vec<Option<f64>>,
    pub acceleration: Vec<Option<f64>>,
}

impl IndicatorFrame {
    /// Compute all indicator series from closes. Recomputed fresh per
    /// parameter pair; never mutated in place across pairs.
    pub fn compute(closes: &[f64], alpha: f64, beta: f64) -> Self {
        let es_slow = ewma(closes, alpha);
        let es_fast = ewma(closes, beta);

        let diff = es_fast
            .iter()
            .zip(&es_slow)
            .map(|(fast, slow)| fast - slow)
            .collect();

        let velocity = diff_series(&es_fast);

        let mut acceleration = Vec::with_capacity(closes.len());
        acceleration.push(None);
        for window in velocity.windows(2) {
            acceleration.push(match (window[0], window[1]) {
                (Some(prev), Some(curr)) => Some(curr - prev),
                _ => None,
            });
        }

        IndicatorFrame {
            es_slow,
            es_fast,
            diff,
            velocity,
            acceleration,
        }
    }

    pub fn len(&self) -> usize {
        self.diff.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diff.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ewma_seeded_with_first_value() {
        let values = vec![10.0, 20.0, 30.0];
        let result = ewma(&values, 0.5);

        assert_relative_eq!(result[0], 10.0);
        assert_relative_eq!(result[1], 15.0);
        assert_relative_eq!(result[2], 22.5);
    }

    #[test]
    fn test_ewma_constant_input_is_constant() {
        let values = vec![100.0; 8];
        let result = ewma(&values, 0.3);
        for v in result {
            assert_relative_eq!(v, 100.0);
        }
    }

    #[test]
    fn test_ewma_empty_input() {
        assert!(ewma(&[], 0.5).is_empty());
    }

    #[test]
    fn test_diff_series_warm_up() {
        let result = diff_series(&[1.0, 3.0, 6.0]);
        assert_eq!(result[0], None);
        assert_eq!(result[1], Some(2.0));
        assert_eq!(result[2], Some(3.0));
    }

    #[test]
    fn test_frame_lengths_match_input() {
        let closes: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let frame = IndicatorFrame::compute(&closes, 0.1, 0.3);

        assert_eq!(frame.es_slow.len(), 10);
        assert_eq!(frame.es_fast.len(), 10);
        assert_eq!(frame.diff.len(), 10);
        assert_eq!(frame.velocity.len(), 10);
        assert_eq!(frame.acceleration.len(), 10);
    }

    #[test]
    fn test_acceleration_defined_from_third_bar() {
        let closes = vec![100.0, 101.0, 103.0, 102.0];
        let frame = IndicatorFrame::compute(&closes, 0.1, 0.3);

        assert_eq!(frame.velocity[0], None);
        assert!(frame.velocity[1].is_some());
        assert_eq!(frame.acceleration[0], None);
        assert_eq!(frame.acceleration[1], None);
        assert!(frame.acceleration[2].is_some());
        assert!(frame.acceleration[3].is_some());
    }

    #[test]
    fn test_diff_zero_on_constant_series() {
        let closes = vec![100.0; 10];
        let frame = IndicatorFrame::compute(&closes, 0.2, 0.6);
        for d in frame.diff {
            assert_relative_eq!(d, 0.0);
        }
    }

    #[test]
    fn test_fast_leads_slow_in_uptrend() {
        // With beta > alpha the fast series tracks a rising price more
        // closely, so diff turns positive once the trend is established.
        let closes: Vec<f64> = (0..20).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let frame = IndicatorFrame::compute(&closes, 0.1, 0.5);
        assert!(*frame.diff.last().unwrap() > 0.0);
    }
}

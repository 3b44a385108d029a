//! Bootstrap uncertainty band around a point prediction.
//!
//! Each trial resamples the historical series with replacement and shifts
//! the prediction by how far the resample mean drifts from the observed
//! mean. The 2.5th and 97.5th percentiles of the shifted predictions form
//! the interval.

use crime_monitor_analytics_models::ForecastInterval;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::AnalyticsError;
use crate::cancel::CancelToken;
use crate::stats;

/// Lower percentile of the bootstrap distribution.
const LOWER_PERCENTILE: f64 = 2.5;
/// Upper percentile of the bootstrap distribution.
const UPPER_PERCENTILE: f64 = 97.5;

/// Configuration for bootstrap interval estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Number of resampling trials.
    pub trials: usize,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            trials: 1000,
            seed: 42,
        }
    }
}

impl BootstrapConfig {
    /// Create a config with the given number of trials.
    #[must_use]
    pub fn new(trials: usize) -> Self {
        Self {
            trials,
            ..Default::default()
        }
    }

    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Resample with replacement.
fn resample(series: &[f64], rng: &mut impl Rng) -> Vec<f64> {
    let n = series.len();
    (0..n).map(|_| series[rng.gen_range(0..n)]).collect()
}

/// Estimates a 95% interval around `prediction` from `series`.
///
/// The lower bound is floored at zero and the upper bound is never below
/// the lower bound. A series of length one (or zero) collapses the
/// interval onto the prediction.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidParameter`] if `prediction` is not finite.
/// * [`AnalyticsError::Cancelled`] if `cancel` is tripped between trials.
pub fn bootstrap_interval(
    prediction: f64,
    series: &[f64],
    config: &BootstrapConfig,
    cancel: &CancelToken,
) -> Result<ForecastInterval, AnalyticsError> {
    if !prediction.is_finite() {
        return Err(AnalyticsError::InvalidParameter {
            message: format!("prediction must be finite, got {prediction}"),
        });
    }

    let Some(observed_mean) = stats::mean(series) else {
        log::debug!("Empty history, collapsing interval onto the prediction");
        return Ok(bounded(prediction, prediction, 0));
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut distribution = Vec::with_capacity(config.trials);

    for _ in 0..config.trials {
        cancel.check()?;
        let sample = resample(series, &mut rng);
        let sample_mean = stats::mean(&sample).unwrap_or(observed_mean);
        distribution.push(prediction + (sample_mean - observed_mean));
    }

    distribution.sort_by(f64::total_cmp);
    let lower = stats::quantile_sorted(&distribution, LOWER_PERCENTILE / 100.0).unwrap_or(prediction);
    let upper = stats::quantile_sorted(&distribution, UPPER_PERCENTILE / 100.0).unwrap_or(prediction);

    Ok(bounded(lower, upper, config.trials))
}

fn bounded(lower: f64, upper: f64, trials: usize) -> ForecastInterval {
    let lower = lower.max(0.0);
    ForecastInterval {
        lower,
        upper: upper.max(lower),
        trials,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(prediction: f64, series: &[f64]) -> ForecastInterval {
        bootstrap_interval(
            prediction,
            series,
            &BootstrapConfig::default(),
            &CancelToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn interval_brackets_prediction() {
        let series = [100.0, 110.0, 90.0, 105.0, 95.0, 120.0, 80.0];
        let interval = run(100.0, &series);
        assert!(interval.lower <= 100.0 && 100.0 <= interval.upper);
        assert!(interval.lower >= 0.0);
        assert!(interval.lower < interval.upper);
        assert_eq!(interval.trials, 1000);
    }

    #[test]
    fn lower_bound_floored_at_zero() {
        let series = [0.0, 50.0, 0.0, 60.0, 1.0];
        let interval = run(2.0, &series);
        assert!(interval.lower >= 0.0);
        assert!(interval.lower <= interval.upper);

        let negative = run(-100.0, &series);
        assert!(negative.lower >= 0.0);
        assert!(negative.lower <= negative.upper);
    }

    #[test]
    fn degenerate_series_collapses() {
        let single = run(42.0, &[7.0]);
        assert!((single.lower - 42.0).abs() < 1e-9);
        assert!((single.upper - 42.0).abs() < 1e-9);

        let empty = run(42.0, &[]);
        assert!((empty.lower - 42.0).abs() < f64::EPSILON);
        assert!((empty.upper - 42.0).abs() < f64::EPSILON);
        assert_eq!(empty.trials, 0);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let series = [3.0, 9.0, 1.0, 12.0, 6.0];
        assert_eq!(run(8.0, &series), run(8.0, &series));
    }

    #[test]
    fn rejects_non_finite_prediction() {
        let err = bootstrap_interval(
            f64::NAN,
            &[1.0],
            &BootstrapConfig::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidParameter { .. }));
    }

    #[test]
    fn cancelled_before_first_trial() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = bootstrap_interval(1.0, &[1.0, 2.0], &BootstrapConfig::default(), &cancel)
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Cancelled));
    }
}

//! Quantile-based risk tiers for predicted values.

use crime_monitor_analytics_models::RiskTier;

use crate::stats;

/// Percentile that separates low from moderate.
const LOW_PERCENTILE: f64 = 33.0;
/// Percentile that separates moderate from high.
const HIGH_PERCENTILE: f64 = 66.0;
/// Minimum value of the low threshold.
const LOW_FLOOR: f64 = 5.0;
/// Minimum value of the high threshold.
const HIGH_FLOOR: f64 = 10.0;

/// Low and high thresholds derived from a historical series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    /// Values at or below this are low risk.
    pub low: f64,
    /// Values at or below this (and above `low`) are moderate risk.
    pub high: f64,
}

/// Computes the floored 33rd/66th percentile thresholds over the strictly
/// positive values of `history`. `None` if there are no positive values.
#[must_use]
pub fn risk_thresholds(history: &[f64]) -> Option<RiskThresholds> {
    let positive: Vec<f64> = history
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();

    let low = stats::percentile(&positive, LOW_PERCENTILE)?;
    let high = stats::percentile(&positive, HIGH_PERCENTILE)?;

    Some(RiskThresholds {
        low: low.max(LOW_FLOOR),
        high: high.max(HIGH_FLOOR),
    })
}

/// Classifies `predicted` against the thresholds derived from `history`.
///
/// Never fails: a history with no positive values yields [`RiskTier::Low`].
#[must_use]
pub fn classify_risk(predicted: f64, history: &[f64]) -> RiskTier {
    let Some(thresholds) = risk_thresholds(history) else {
        return RiskTier::Low;
    };

    if predicted <= thresholds.low {
        RiskTier::Low
    } else if predicted <= thresholds.high {
        RiskTier::Moderate
    } else {
        RiskTier::High
    }
}

//! Trend and momentum classification.

use crime_monitor_analytics_models::{Momentum, TrendLabel};

use crate::stats;

/// Upper bound (inclusive) of the severe-decline band.
const SEVERE_DECLINE: f64 = -0.20;
/// Upper bound (inclusive) of the mild-decline band.
const MILD_DECLINE: f64 = -0.05;
/// Upper bound (exclusive) of the stable band.
const STABLE: f64 = 0.05;
/// Upper bound (exclusive) of the mild-increase band.
const MILD_INCREASE: f64 = 0.20;

/// Momentum ratio above which a series is increasing.
const MOMENTUM_UP: f64 = 1.05;
/// Momentum ratio below which a series is decreasing.
const MOMENTUM_DOWN: f64 = 0.95;
/// Periods in each half of the momentum window.
const MOMENTUM_HALF_WINDOW: usize = 2;

/// Maps a relative difference `(value - reference) / reference` onto the
/// five-point trend scale.
///
/// A non-finite ratio yields [`TrendLabel::InsufficientData`].
#[must_use]
pub fn classify_trend(diff_ratio: f64) -> TrendLabel {
    if !diff_ratio.is_finite() {
        return TrendLabel::InsufficientData;
    }
    if diff_ratio <= SEVERE_DECLINE {
        TrendLabel::SevereDecline
    } else if diff_ratio <= MILD_DECLINE {
        TrendLabel::MildDecline
    } else if diff_ratio < STABLE {
        TrendLabel::Stable
    } else if diff_ratio < MILD_INCREASE {
        TrendLabel::MildIncrease
    } else {
        TrendLabel::SevereIncrease
    }
}

/// Classifies `value` against `reference`.
///
/// Returns [`TrendLabel::InsufficientData`] when the reference is missing
/// or zero.
#[must_use]
pub fn classify_trend_against(value: f64, reference: Option<f64>) -> TrendLabel {
    match reference {
        Some(reference) if reference != 0.0 => classify_trend((value - reference) / reference),
        _ => TrendLabel::InsufficientData,
    }
}

/// Compares the mean of the last two periods with the mean of the two
/// before them.
#[must_use]
pub fn classify_momentum(series: &[f64]) -> Momentum {
    let window = MOMENTUM_HALF_WINDOW * 2;
    if series.len() < window {
        return Momentum::Undefined;
    }

    let tail = &series[series.len() - window..];
    let (earlier, recent) = tail.split_at(MOMENTUM_HALF_WINDOW);
    let (Some(earlier), Some(recent)) = (stats::mean(earlier), stats::mean(recent)) else {
        return Momentum::Undefined;
    };
    if earlier == 0.0 {
        return Momentum::Undefined;
    }

    let ratio = recent / earlier;
    if !ratio.is_finite() {
        Momentum::Undefined
    } else if ratio > MOMENTUM_UP {
        Momentum::Increasing
    } else if ratio < MOMENTUM_DOWN {
        Momentum::Decreasing
    } else {
        Momentum::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges() {
        assert_eq!(classify_trend(-0.20), TrendLabel::SevereDecline);
        assert_eq!(classify_trend(-0.199), TrendLabel::MildDecline);
        assert_eq!(classify_trend(-0.05), TrendLabel::MildDecline);
        assert_eq!(classify_trend(-0.049), TrendLabel::Stable);
        assert_eq!(classify_trend(0.0), TrendLabel::Stable);
        assert_eq!(classify_trend(0.05), TrendLabel::MildIncrease);
        assert_eq!(classify_trend(0.199), TrendLabel::MildIncrease);
        assert_eq!(classify_trend(0.20), TrendLabel::SevereIncrease);
        assert_eq!(classify_trend(f64::NAN), TrendLabel::InsufficientData);
    }

    #[test]
    fn monotonic_over_a_sweep() {
        let mut previous = classify_trend(-1.0).rank().unwrap();
        let mut r = -1.0;
        while r <= 1.0 {
            let rank = classify_trend(r).rank().unwrap();
            assert!(rank >= previous, "rank decreased at {r}");
            previous = rank;
            r += 0.001;
        }
    }

    #[test]
    fn three_month_series_scenario() {
        // (2023-01, 100), (2023-02, 110), (2023-03, 90) with reference 100
        let series = [100.0, 110.0, 90.0];
        let label = classify_trend_against(series[2], Some(series[0]));
        assert_eq!(label, TrendLabel::MildDecline);
    }

    #[test]
    fn missing_or_zero_reference() {
        assert_eq!(
            classify_trend_against(10.0, None),
            TrendLabel::InsufficientData
        );
        assert_eq!(
            classify_trend_against(10.0, Some(0.0)),
            TrendLabel::InsufficientData
        );
    }

    #[test]
    fn momentum_window() {
        assert_eq!(classify_momentum(&[1.0, 2.0, 3.0]), Momentum::Undefined);
        assert_eq!(
            classify_momentum(&[50.0, 100.0, 100.0, 120.0, 120.0]),
            Momentum::Increasing
        );
        assert_eq!(
            classify_momentum(&[100.0, 100.0, 80.0, 80.0]),
            Momentum::Decreasing
        );
        assert_eq!(
            classify_momentum(&[100.0, 100.0, 102.0, 101.0]),
            Momentum::Stable
        );
        assert_eq!(
            classify_momentum(&[0.0, 0.0, 5.0, 5.0]),
            Momentum::Undefined
        );
    }
}

//! Descriptive statistics shared by the analytics modules.

/// Maps `NaN` and infinities to `None`.
#[must_use]
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() { Some(value) } else { None }
}

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator), `None` for fewer than two values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    Some(sum_sq / (values.len() - 1) as f64)
}

/// Population variance (n denominator), `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    Some(sum_sq / values.len() as f64)
}

/// Returns the `q`-th quantile (0.0 to 1.0) of an already sorted slice,
/// interpolating linearly between the closest ranks.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    if n == 1 {
        return Some(sorted[0]);
    }

    let q = q.clamp(0.0, 1.0);
    let pos = q * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    if lower == upper {
        Some(sorted[lower])
    } else {
        Some(sorted[lower].mul_add(1.0 - frac, sorted[upper] * frac))
    }
}

/// Returns the `p`-th percentile (0 to 100) using linear interpolation
/// between the closest ranks.
#[must_use]
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, p / 100.0)
}

/// Pearson correlation coefficient.
///
/// Returns `None` when the slices differ in length, have fewer than two
/// points, or either has zero variance.
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    finite(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Percent change from `previous` to `current`.
///
/// Undefined when `previous` is not strictly positive.
#[must_use]
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    if previous <= 0.0 {
        return None;
    }
    finite((current - previous) / previous * 100.0)
}

/// Rounds to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Squared Euclidean distance.
#[must_use]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

//! Mean imputation and standardization of the feature matrix.

use crime_monitor_crime_models::{CrimeCategory, CrimeRecord};

use crate::AnalyticsError;
use crate::stats;

/// A dense, imputed feature matrix with its surviving columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Column names, in order.
    pub features: Vec<CrimeCategory>,
    /// One row per record.
    pub rows: Vec<Vec<f64>>,
}

/// Builds the feature matrix, replacing each missing value with its
/// column mean.
///
/// Columns that are missing in every row are dropped.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidInput`] if there are no records or
/// every retained column is entirely missing.
pub fn impute_means(
    records: &[&CrimeRecord],
    features: &[CrimeCategory],
) -> Result<FeatureMatrix, AnalyticsError> {
    if records.is_empty() {
        return Err(AnalyticsError::InvalidInput {
            message: "no records to cluster".to_string(),
        });
    }

    let mut kept = Vec::with_capacity(features.len());
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(features.len());

    for feature in features {
        let raw: Vec<Option<f64>> = records.iter().map(|r| r.value(*feature)).collect();
        let present: Vec<f64> = raw.iter().flatten().copied().collect();
        let Some(fill) = stats::mean(&present) else {
            log::warn!("Dropping feature {feature}: missing in every row");
            continue;
        };
        kept.push(*feature);
        columns.push(raw.into_iter().map(|v| v.unwrap_or(fill)).collect());
    }

    if kept.is_empty() {
        return Err(AnalyticsError::InvalidInput {
            message: "every retained feature is missing in all rows".to_string(),
        });
    }

    let rows = (0..records.len())
        .map(|i| columns.iter().map(|col| col[i]).collect())
        .collect();

    Ok(FeatureMatrix {
        features: kept,
        rows,
    })
}

/// Per-column mean and standard deviation fitted on a matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fits column means and population standard deviations. A column with
    /// zero variance gets a scale of one.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut means = Vec::with_capacity(n_cols);
        let mut scales = Vec::with_capacity(n_cols);

        for j in 0..n_cols {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            let mean = stats::mean(&column).unwrap_or(0.0);
            let std = stats::population_variance(&column)
                .unwrap_or(0.0)
                .sqrt();
            means.push(mean);
            scales.push(if std > 0.0 { std } else { 1.0 });
        }

        Self { means, scales }
    }

    /// Applies the fitted transform.
    #[must_use]
    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(x, (m, s))| (x - m) / s)
                    .collect()
            })
            .collect()
    }
}

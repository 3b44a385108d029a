//! Per-cluster feature profiles and the feature-importance ranking.

use std::collections::BTreeMap;

use crime_monitor_analytics_models::{ClusterProfile, FeatureImportance};
use crime_monitor_crime_models::CrimeCategory;

use crate::stats;

const IMPORTANCE_EPSILON: f64 = 1e-6;

/// Values of feature `j` for each cluster's members.
fn columns_by_cluster(rows: &[Vec<f64>], labels: &[usize], k: usize, j: usize) -> Vec<Vec<f64>> {
    let mut grouped = vec![Vec::new(); k];
    for (row, &label) in rows.iter().zip(labels) {
        grouped[label].push(row[j]);
    }
    grouped
}

/// Builds one profile per cluster from the imputed, unscaled matrix.
///
/// Means are rounded to two decimals. The normalized variant rescales each
/// feature to `[0, 1]` across cluster means; a feature whose means are all
/// equal normalizes to zero. Empty clusters get an empty profile.
#[must_use]
pub fn cluster_profiles(
    features: &[CrimeCategory],
    rows: &[Vec<f64>],
    labels: &[usize],
    k: usize,
) -> Vec<ClusterProfile> {
    let mut profiles: Vec<ClusterProfile> = (0..k)
        .map(|cluster| ClusterProfile {
            cluster,
            size: labels.iter().filter(|&&l| l == cluster).count(),
            means: BTreeMap::new(),
            normalized: BTreeMap::new(),
        })
        .collect();

    for (j, feature) in features.iter().enumerate() {
        let means: Vec<Option<f64>> = columns_by_cluster(rows, labels, k, j)
            .iter()
            .map(|values| stats::mean(values).map(stats::round2))
            .collect();

        let present = means.iter().flatten();
        let min = present.clone().copied().fold(f64::INFINITY, f64::min);
        let max = present.copied().fold(f64::NEG_INFINITY, f64::max);
        let span = max - min;

        for (profile, mean) in profiles.iter_mut().zip(means) {
            let Some(mean) = mean else {
                continue;
            };
            let normalized = if span > 0.0 { (mean - min) / span } else { 0.0 };
            profile.means.insert(*feature, mean);
            profile.normalized.insert(*feature, normalized);
        }
    }

    profiles
}

/// Ranks features by how well they separate clusters: the sample variance
/// of the per-cluster means over the mean within-cluster sample variance.
///
/// Clusters with fewer than two members contribute no within-cluster
/// variance. Sorted descending, ties broken by feature name.
#[must_use]
pub fn feature_importances(
    features: &[CrimeCategory],
    rows: &[Vec<f64>],
    labels: &[usize],
    k: usize,
) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = features
        .iter()
        .enumerate()
        .map(|(j, feature)| {
            let grouped = columns_by_cluster(rows, labels, k, j);
            let means: Vec<f64> = grouped.iter().filter_map(|v| stats::mean(v)).collect();
            let within: Vec<f64> = grouped
                .iter()
                .filter_map(|v| stats::sample_variance(v))
                .collect();

            let between = stats::sample_variance(&means).unwrap_or(0.0);
            let within = stats::mean(&within).unwrap_or(0.0);

            FeatureImportance {
                feature: *feature,
                importance: stats::finite(between / (within + IMPORTANCE_EPSILON))
                    .unwrap_or(0.0),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then_with(|| a.feature.as_ref().cmp(b.feature.as_ref()))
    });
    ranked
}

//! Groups records into behavioural clusters and explains the grouping.
//!
//! The pipeline runs in fixed stages: mean imputation, standardization,
//! seeded k-means, a two-component PCA projection for plotting, per-cluster
//! profiles, a feature-importance ranking, quality indices and an elbow
//! curve. Cancellation is checked between stages and inside every k-means
//! loop.

pub mod kmeans;
pub mod pca;
pub mod prepare;
pub mod profile;
pub mod quality;
pub mod schema;

use std::collections::HashSet;

use crime_monitor_analytics_models::{ClusterPoint, ClusterResult, ElbowPoint};
use crime_monitor_crime_models::CrimeRecord;

use crate::AnalyticsError;
use crate::cancel::CancelToken;
use kmeans::{KMeansConfig, kmeans};
use prepare::{StandardScaler, impute_means};
use schema::RetainedFeatureSchema;

/// Tunables for the clustering pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusteringConfig {
    /// Features the pipeline works on.
    pub schema: RetainedFeatureSchema,
    /// Cap on k-means rounds.
    pub max_iter: usize,
    /// Seed shared by k-means initialization and silhouette sampling.
    pub seed: u64,
    /// Maximum rows used for the silhouette score.
    pub silhouette_sample: usize,
    /// Largest k evaluated on the elbow curve.
    pub elbow_max_k: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            schema: RetainedFeatureSchema::default(),
            max_iter: 300,
            seed: 42,
            silhouette_sample: 2000,
            elbow_max_k: 10,
        }
    }
}

/// Runs the full pipeline over `records` with `k` requested clusters.
///
/// When `k` exceeds the number of distinct feature rows it is lowered to
/// that count and [`ClusterResult::k`] reports the value actually used.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidInput`] if `records` is empty or every
///   retained feature is missing.
/// * [`AnalyticsError::InvalidParameter`] if `k` is zero or exceeds the
///   number of records.
/// * [`AnalyticsError::Cancelled`] if `cancel` is tripped.
pub fn run_pipeline(
    records: &[&CrimeRecord],
    k: usize,
    config: &ClusteringConfig,
    cancel: &CancelToken,
) -> Result<ClusterResult, AnalyticsError> {
    let matrix = impute_means(records, config.schema.features)?;
    let n = matrix.rows.len();
    if k == 0 || k > n {
        return Err(AnalyticsError::InvalidParameter {
            message: format!("k must be between 1 and {n}, got {k}"),
        });
    }

    let distinct = distinct_rows(&matrix.rows);
    let effective_k = if k > distinct {
        log::warn!("Requested k={k} but only {distinct} distinct rows, using k={distinct}");
        distinct
    } else {
        k
    };

    let scaled = StandardScaler::fit(&matrix.rows).transform(&matrix.rows);
    cancel.check()?;

    let base = KMeansConfig::default()
        .max_iter(config.max_iter)
        .seed(config.seed);
    let clustering = kmeans(&scaled, &base.k(effective_k), cancel)?;
    cancel.check()?;

    let projection = pca::project(&scaled);
    let profiles =
        profile::cluster_profiles(&matrix.features, &matrix.rows, &clustering.labels, effective_k);
    let importances = profile::feature_importances(
        &matrix.features,
        &matrix.rows,
        &clustering.labels,
        effective_k,
    );
    cancel.check()?;

    let quality = quality::cluster_quality(
        &scaled,
        &clustering.labels,
        &clustering.centroids,
        config.silhouette_sample,
        config.seed,
    );

    let mut elbow = Vec::new();
    for candidate in 1..=config.elbow_max_k.min(distinct) {
        let fit = kmeans(&scaled, &base.k(candidate), cancel)?;
        elbow.push(ElbowPoint {
            k: candidate,
            inertia: fit.inertia,
        });
    }

    let points = records
        .iter()
        .zip(&clustering.labels)
        .zip(&projection.coordinates)
        .map(|((record, &cluster), &(pc1, pc2))| ClusterPoint {
            region: record.region.clone(),
            period: record.period,
            cluster,
            pc1,
            pc2,
        })
        .collect();

    log::debug!(
        "Clustered {n} rows into {effective_k} clusters over {} features",
        matrix.features.len()
    );

    Ok(ClusterResult {
        requested_k: k,
        k: effective_k,
        schema_version: config.schema.version,
        features: matrix.features,
        points,
        explained_variance: projection.explained_variance,
        profiles,
        importances,
        quality,
        elbow,
    })
}

/// Number of distinct rows, compared bit-for-bit.
fn distinct_rows(rows: &[Vec<f64>]) -> usize {
    rows.iter()
        .map(|row| row.iter().map(|x| x.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}

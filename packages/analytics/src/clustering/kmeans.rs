//! Seeded k-means with k-means++ initialization.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::AnalyticsError;
use crate::cancel::CancelToken;
use crate::stats::squared_distance;

/// K-means configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeansConfig {
    /// Number of clusters.
    pub k: usize,
    /// Maximum assignment/update rounds.
    pub max_iter: usize,
    /// Random seed for initialization.
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 4,
            max_iter: 300,
            seed: 42,
        }
    }
}

impl KMeansConfig {
    /// Set number of clusters.
    #[must_use]
    pub const fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set maximum iterations.
    #[must_use]
    pub const fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set random seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// K-means result.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster assignment per row, in `0..k`.
    pub labels: Vec<usize>,
    /// Cluster centroids.
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
    /// Number of rounds performed.
    pub n_iter: usize,
}

impl KMeansResult {
    /// Number of rows assigned to each cluster.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Partitions `rows` into `config.k` clusters.
///
/// Stops when no assignment changes or after `max_iter` rounds. A cluster
/// that loses every member keeps its previous centroid.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidParameter`] if `k` is zero or exceeds the
///   number of rows.
/// * [`AnalyticsError::Cancelled`] if `cancel` is tripped between rounds.
pub fn kmeans(
    rows: &[Vec<f64>],
    config: &KMeansConfig,
    cancel: &CancelToken,
) -> Result<KMeansResult, AnalyticsError> {
    let n = rows.len();
    let k = config.k;
    if k == 0 || k > n {
        return Err(AnalyticsError::InvalidParameter {
            message: format!("k must be between 1 and {n}, got {k}"),
        });
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centroids = initialize_centroids(rows, k, &mut rng);
    let mut labels: Vec<usize> = rows.iter().map(|r| nearest(r, &centroids).0).collect();
    let mut n_iter = 1;

    while n_iter < config.max_iter {
        cancel.check()?;
        update_centroids(rows, &labels, &mut centroids);

        let next: Vec<usize> = rows.iter().map(|r| nearest(r, &centroids).0).collect();
        n_iter += 1;
        if next == labels {
            break;
        }
        labels = next;
    }

    log::debug!("k-means with k={k} finished after {n_iter} rounds");

    let inertia = inertia(rows, &labels, &centroids);
    Ok(KMeansResult {
        labels,
        centroids,
        inertia,
        n_iter,
    })
}

/// Sum of squared distances from each row to its centroid.
#[must_use]
pub fn inertia(rows: &[Vec<f64>], labels: &[usize], centroids: &[Vec<f64>]) -> f64 {
    rows.iter()
        .zip(labels)
        .map(|(row, &label)| squared_distance(row, &centroids[label]))
        .sum()
}

fn initialize_centroids(rows: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(rows[rng.gen_range(0..rows.len())].clone());

    while centroids.len() < k {
        let distances: Vec<f64> = rows.iter().map(|r| nearest(r, &centroids).1).collect();
        let total: f64 = distances.iter().sum();

        let chosen = if total > 0.0 {
            let target = rng.gen_range(0.0..total);
            let mut cumulative = 0.0;
            distances
                .iter()
                .position(|d| {
                    cumulative += d;
                    cumulative >= target && *d > 0.0
                })
                .or_else(|| distances.iter().rposition(|d| *d > 0.0))
        } else {
            None
        };

        // Every row coincides with a centroid; duplicates are the only option.
        centroids.push(rows[chosen.unwrap_or(0)].clone());
    }

    centroids
}

fn nearest(row: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(row, centroid);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn update_centroids(rows: &[Vec<f64>], labels: &[usize], centroids: &mut [Vec<f64>]) {
    let dim = centroids.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dim]; centroids.len()];
    let mut counts = vec![0_usize; centroids.len()];

    for (row, &label) in rows.iter().zip(labels) {
        counts[label] += 1;
        for (acc, x) in sums[label].iter_mut().zip(row) {
            *acc += x;
        }
    }

    for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
        if count == 0 {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = count as f64;
        *centroid = sum.into_iter().map(|s| s / count).collect();
    }
}

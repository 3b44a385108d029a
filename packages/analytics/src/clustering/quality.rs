//! Internal cluster-quality indices.
//!
//! All three indices work on the standardized matrix and are undefined
//! (`None`) when fewer than two clusters are populated.

use crime_monitor_analytics_models::ClusterQuality;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::stats::{self, squared_distance};

/// Computes the silhouette, Calinski-Harabasz and Davies-Bouldin indices.
///
/// The silhouette is quadratic in the number of rows, so it is computed on
/// at most `silhouette_sample` rows drawn with `seed`.
#[must_use]
pub fn cluster_quality(
    rows: &[Vec<f64>],
    labels: &[usize],
    centroids: &[Vec<f64>],
    silhouette_sample: usize,
    seed: u64,
) -> ClusterQuality {
    let populated = populated_clusters(labels, centroids.len());
    if populated.len() < 2 {
        return ClusterQuality::default();
    }

    ClusterQuality {
        silhouette: silhouette(rows, labels, centroids.len(), silhouette_sample, seed),
        calinski_harabasz: calinski_harabasz(rows, labels, centroids, &populated),
        davies_bouldin: davies_bouldin(rows, labels, centroids, &populated),
    }
}

fn populated_clusters(labels: &[usize], k: usize) -> Vec<usize> {
    let mut sizes = vec![0_usize; k];
    for &label in labels {
        sizes[label] += 1;
    }
    (0..k).filter(|&c| sizes[c] > 0).collect()
}

#[allow(clippy::cast_precision_loss)]
fn silhouette(
    rows: &[Vec<f64>],
    labels: &[usize],
    k: usize,
    sample: usize,
    seed: u64,
) -> Option<f64> {
    let indices: Vec<usize> = if rows.len() > sample {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut picked = rand::seq::index::sample(&mut rng, rows.len(), sample).into_vec();
        picked.sort_unstable();
        picked
    } else {
        (0..rows.len()).collect()
    };

    let distinct = populated_clusters(
        &indices.iter().map(|&i| labels[i]).collect::<Vec<_>>(),
        k,
    );
    if distinct.len() < 2 || distinct.len() >= indices.len() {
        return None;
    }

    let scores: Vec<f64> = indices
        .iter()
        .map(|&i| {
            let mut sums = vec![0.0; k];
            let mut counts = vec![0_usize; k];
            for &j in &indices {
                if i == j {
                    continue;
                }
                sums[labels[j]] += squared_distance(&rows[i], &rows[j]).sqrt();
                counts[labels[j]] += 1;
            }

            let own = labels[i];
            if counts[own] == 0 {
                return 0.0;
            }
            let a = sums[own] / counts[own] as f64;
            let b = (0..k)
                .filter(|&c| c != own && counts[c] > 0)
                .map(|c| sums[c] / counts[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 { (b - a) / denom } else { 0.0 }
        })
        .collect();

    stats::mean(&scores).and_then(stats::finite)
}

#[allow(clippy::cast_precision_loss)]
fn calinski_harabasz(
    rows: &[Vec<f64>],
    labels: &[usize],
    centroids: &[Vec<f64>],
    populated: &[usize],
) -> Option<f64> {
    let n = rows.len();
    let k = populated.len();
    if n <= k {
        return None;
    }

    let dim = rows.first().map_or(0, Vec::len);
    let overall: Vec<f64> = (0..dim)
        .map(|j| stats::mean(&rows.iter().map(|r| r[j]).collect::<Vec<_>>()).unwrap_or(0.0))
        .collect();

    let between: f64 = populated
        .iter()
        .map(|&c| {
            let size = labels.iter().filter(|&&l| l == c).count() as f64;
            size * squared_distance(&centroids[c], &overall)
        })
        .sum();
    let within: f64 = rows
        .iter()
        .zip(labels)
        .map(|(row, &label)| squared_distance(row, &centroids[label]))
        .sum();

    if within <= 0.0 {
        return None;
    }
    stats::finite((between / (k - 1) as f64) / (within / (n - k) as f64))
}

#[allow(clippy::cast_precision_loss)]
fn davies_bouldin(
    rows: &[Vec<f64>],
    labels: &[usize],
    centroids: &[Vec<f64>],
    populated: &[usize],
) -> Option<f64> {
    let scatter: Vec<f64> = (0..centroids.len())
        .map(|c| {
            let distances: Vec<f64> = rows
                .iter()
                .zip(labels)
                .filter(|(_, l)| **l == c)
                .map(|(row, _)| squared_distance(row, &centroids[c]).sqrt())
                .collect();
            stats::mean(&distances).unwrap_or(0.0)
        })
        .collect();

    let worst: Vec<f64> = populated
        .iter()
        .map(|&i| {
            populated
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| {
                    let separation = squared_distance(&centroids[i], &centroids[j]).sqrt();
                    if separation > 0.0 {
                        (scatter[i] + scatter[j]) / separation
                    } else {
                        0.0
                    }
                })
                .fold(0.0, f64::max)
        })
        .collect();

    stats::mean(&worst).and_then(stats::finite)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> (Vec<Vec<f64>>, Vec<usize>, Vec<Vec<f64>>) {
        let rows = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 0.0],
            vec![10.0, 1.0],
        ];
        let labels = vec![0, 0, 1, 1];
        let centroids = vec![vec![0.0, 0.5], vec![10.0, 0.5]];
        (rows, labels, centroids)
    }

    #[test]
    fn well_separated_clusters_score_well() {
        let (rows, labels, centroids) = two_blobs();
        let quality = cluster_quality(&rows, &labels, &centroids, 2000, 42);

        let silhouette = quality.silhouette.unwrap();
        assert!(silhouette > 0.85 && silhouette <= 1.0);

        // between = 4 * 25 = 100 over 1 degree, within = 4 * 0.25 = 1 over 2.
        assert!((quality.calinski_harabasz.unwrap() - 200.0).abs() < 1e-9);

        // scatter 0.5 per cluster, separation 10.
        assert!((quality.davies_bouldin.unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn single_cluster_is_undefined() {
        let (rows, _, _) = two_blobs();
        let quality = cluster_quality(&rows, &[0, 0, 0, 0], &[vec![5.0, 0.5]], 2000, 42);
        assert_eq!(quality, ClusterQuality::default());

        // A second, empty cluster does not count.
        let quality = cluster_quality(
            &rows,
            &[0, 0, 0, 0],
            &[vec![5.0, 0.5], vec![100.0, 100.0]],
            2000,
            42,
        );
        assert_eq!(quality.silhouette, None);
    }

    #[test]
    fn sampled_silhouette_is_reproducible() {
        let rows: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![f64::from(i % 2) * 10.0 + f64::from(i) * 0.01])
            .collect();
        let labels: Vec<usize> = (0..50).map(|i| i % 2).collect();
        let centroids = vec![vec![0.25], vec![10.25]];
        let a = cluster_quality(&rows, &labels, &centroids, 10, 7);
        let b = cluster_quality(&rows, &labels, &centroids, 10, 7);
        assert_eq!(a, b);
        assert!(a.silhouette.unwrap() > 0.9);
    }
}

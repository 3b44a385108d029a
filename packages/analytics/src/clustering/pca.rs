//! Two-component PCA by power iteration with deflation.
//!
//! The feature count is small (a dozen columns), so the covariance matrix
//! is formed explicitly and its two leading eigenvectors are extracted one
//! at a time. After each component is found, it is removed from the matrix
//! (`C -= λ v vᵀ`) before the next power iteration.

use crate::stats;

const MAX_ITERATIONS: usize = 500;
const TOLERANCE: f64 = 1e-10;

/// Rows projected onto the first two principal components.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// `(pc1, pc2)` per row.
    pub coordinates: Vec<(f64, f64)>,
    /// Share of total variance captured by each component, or `None` when
    /// the component does not exist or the data has no variance.
    pub explained_variance: [Option<f64>; 2],
}

/// Projects centred `rows` onto their two leading principal components.
#[must_use]
pub fn project(rows: &[Vec<f64>]) -> Projection {
    let dim = rows.first().map_or(0, Vec::len);
    let centred = centre(rows, dim);
    let mut covariance = covariance(&centred, dim);
    let total: f64 = (0..dim).map(|i| covariance[i][i]).sum();

    let mut pairs: Vec<(f64, Vec<f64>)> = Vec::with_capacity(2);
    if total > 0.0 {
        while pairs.len() < dim.min(2) {
            let found: Vec<Vec<f64>> = pairs.iter().map(|(_, v)| v.clone()).collect();
            let (eigenvalue, vector) = leading_eigenpair(&covariance, dim, &found);
            deflate(&mut covariance, eigenvalue, &vector);
            pairs.push((eigenvalue, vector));
        }
    }
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut components: Vec<Option<Vec<f64>>> = vec![None, None];
    let mut explained = [None, None];
    for (i, (eigenvalue, vector)) in pairs.into_iter().enumerate() {
        explained[i] = stats::finite((eigenvalue / total).max(0.0));
        components[i] = Some(vector);
    }

    let coordinates = centred
        .iter()
        .map(|row| {
            let along = |c: &Option<Vec<f64>>| c.as_ref().map_or(0.0, |v| dot(row, v));
            (along(&components[0]), along(&components[1]))
        })
        .collect();

    Projection {
        coordinates,
        explained_variance: explained,
    }
}

fn centre(rows: &[Vec<f64>], dim: usize) -> Vec<Vec<f64>> {
    let means: Vec<f64> = (0..dim)
        .map(|j| {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            stats::mean(&column).unwrap_or(0.0)
        })
        .collect();
    rows.iter()
        .map(|r| r.iter().zip(&means).map(|(x, m)| x - m).collect())
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn covariance(centred: &[Vec<f64>], dim: usize) -> Vec<Vec<f64>> {
    let mut c = vec![vec![0.0; dim]; dim];
    if centred.is_empty() {
        return c;
    }
    for row in centred {
        for i in 0..dim {
            for j in i..dim {
                c[i][j] += row[i] * row[j];
            }
        }
    }
    let n = centred.len() as f64;
    for i in 0..dim {
        for j in i..dim {
            c[i][j] /= n;
            c[j][i] = c[i][j];
        }
    }
    c
}

/// Dominant eigenpair of `matrix` in the subspace orthogonal to `found`.
///
/// A single start can sit exactly on a minor eigenvector and never leave
/// it, so the iteration is run from a spread start and from every basis
/// vector, keeping the largest Rayleigh quotient.
#[allow(clippy::cast_precision_loss)]
fn leading_eigenpair(matrix: &[Vec<f64>], dim: usize, found: &[Vec<f64>]) -> (f64, Vec<f64>) {
    let spread: Vec<f64> = (0..dim).map(|i| 1.0 + i as f64 / dim as f64).collect();
    let basis = (0..dim).map(|axis| (0..dim).map(|i| if i == axis { 1.0 } else { 0.0 }).collect::<Vec<f64>>());

    let mut best: Option<(f64, Vec<f64>)> = None;
    for start in std::iter::once(spread).chain(basis) {
        let Some(vector) = power_iteration(matrix, start, found) else {
            continue;
        };
        let eigenvalue = dot(&multiply(matrix, &vector), &vector);
        if best.as_ref().is_none_or(|(value, _)| eigenvalue > *value + TOLERANCE) {
            best = Some((eigenvalue, vector));
        }
    }

    best.unwrap_or_else(|| (0.0, vec![0.0; dim]))
}

/// Power iteration from `start`, kept orthogonal to `found`. `None` when
/// the start has no component outside `found`.
fn power_iteration(matrix: &[Vec<f64>], mut v: Vec<f64>, found: &[Vec<f64>]) -> Option<Vec<f64>> {
    orthogonalize(&mut v, found);
    if normalize(&mut v) < TOLERANCE {
        return None;
    }

    for _ in 0..MAX_ITERATIONS {
        let mut next = multiply(matrix, &v);
        orthogonalize(&mut next, found);
        if normalize(&mut next) == 0.0 {
            break;
        }
        let change: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        if change < TOLERANCE {
            break;
        }
    }

    // Fix the sign so the largest component is positive.
    let pivot = v
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        for x in &mut v {
            *x = -*x;
        }
    }

    Some(v)
}

fn deflate(matrix: &mut [Vec<f64>], eigenvalue: f64, vector: &[f64]) {
    for (i, row) in matrix.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell -= eigenvalue * vector[i] * vector[j];
        }
    }
}

/// Removes the components of `v` along each already-found eigenvector so
/// numerical residue left by deflation cannot pull it back.
fn orthogonalize(v: &mut [f64], found: &[Vec<f64>]) {
    for u in found {
        let along = dot(v, u);
        for (x, y) in v.iter_mut().zip(u) {
            *x -= along * y;
        }
    }
}

fn multiply(matrix: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    matrix.iter().map(|row| dot(row, v)).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(v: &mut [f64]) -> f64 {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    norm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_is_captured_by_first_component() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![f64::from(i), 2.0 * f64::from(i)]).collect();
        let projection = project(&rows);
        assert!((projection.explained_variance[0].unwrap() - 1.0).abs() < 1e-6);
        assert!(projection.explained_variance[1].unwrap() < 1e-6);
        assert!(projection.coordinates.iter().all(|(_, pc2)| pc2.abs() < 1e-6));
    }

    #[test]
    fn ratios_sum_to_at_most_one() {
        let rows = vec![
            vec![1.0, 0.0, 3.0],
            vec![0.0, 2.0, 1.0],
            vec![4.0, 1.0, 0.0],
            vec![2.0, 3.0, 2.0],
        ];
        let projection = project(&rows);
        let first = projection.explained_variance[0].unwrap();
        let second = projection.explained_variance[1].unwrap();
        assert!(first >= second);
        assert!(first + second <= 1.0 + 1e-9);
        assert_eq!(projection.coordinates.len(), 4);
    }

    #[test]
    fn single_feature_has_no_second_component() {
        let rows = vec![vec![1.0], vec![2.0], vec![4.0]];
        let projection = project(&rows);
        assert!((projection.explained_variance[0].unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(projection.explained_variance[1], None);
        assert!(projection.coordinates.iter().all(|(_, pc2)| *pc2 == 0.0));
    }

    #[test]
    fn constant_data_projects_to_origin() {
        let rows = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        let projection = project(&rows);
        assert_eq!(projection.explained_variance, [None, None]);
        assert!(projection.coordinates.iter().all(|p| *p == (0.0, 0.0)));
    }

    #[test]
    fn minor_axis_start_still_finds_major_component() {
        // Major spread along (3, -2), minor along (2, 3). The spread start
        // vector (1, 1.5) lies exactly on the minor axis.
        let mut rows = Vec::new();
        for t in [-2.0, -1.0, 1.0, 2.0] {
            for s in [-0.1, 0.1] {
                rows.push(vec![3.0f64.mul_add(t, 2.0 * s), (-2.0f64).mul_add(t, 3.0 * s)]);
            }
        }
        let projection = project(&rows);
        let first = projection.explained_variance[0].unwrap();
        let second = projection.explained_variance[1].unwrap();
        assert!(first >= second);
        assert!(first > 0.99);

        // pc1 is the scalar position along the (3, -2) axis.
        let axis = 13.0f64.sqrt();
        for (row, (pc1, _)) in rows.iter().zip(&projection.coordinates) {
            let expected = (3.0 * row[0] - 2.0 * row[1]) / axis;
            assert!((pc1.abs() - expected.abs()).abs() < 1e-6);
        }
    }
}

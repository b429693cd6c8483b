//! Principal coordinate analysis (classical MDS).

use super::{check_sample_count, fix_signs, order_descending, OrdinationResult};
use crate::distance::DissimilarityMatrix;
use crate::error::{AbrgError, Result};
use nalgebra::DMatrix;

/// Gower-center the matrix of −½·d².
fn gower_center(distance: &DissimilarityMatrix) -> DMatrix<f64> {
    let n = distance.n();
    let a = distance.matrix().map(|d| -0.5 * d * d);
    let row_means: Vec<f64> = a.row_iter().map(|r| r.mean()).collect();
    let grand_mean = row_means.iter().sum::<f64>() / n as f64;
    // A is symmetric, so column means equal row means
    DMatrix::from_fn(n, n, |i, j| a[(i, j)] - row_means[i] - row_means[j] + grand_mean)
}

/// PCoA of a dissimilarity matrix.
///
/// Eigenpairs of the double-centered matrix are sorted by eigenvalue
/// (descending, stable). Coordinates are eigenvectors scaled by
/// √max(λ, 0); proportion explained is λ over the sum of positive
/// eigenvalues, with negative eigenvalues contributing zero.
pub fn pcoa(distance: &DissimilarityMatrix, n_components: usize) -> Result<OrdinationResult> {
    let n = distance.n();
    check_sample_count(n)?;

    let eig = gower_center(distance).symmetric_eigen();
    let lambda: Vec<f64> = eig.eigenvalues.iter().copied().collect();
    let positive_total: f64 = lambda.iter().filter(|&&l| l > 0.0).sum();
    if positive_total <= 0.0 {
        return Err(AbrgError::DegenerateInput(
            "dissimilarity matrix has no positive eigenvalues".into(),
        ));
    }
    let negatives = lambda.iter().filter(|&&l| l < -1e-10 * positive_total).count();
    if negatives > 0 {
        log::debug!("PCoA: {} negative eigenvalue(s) ignored in variance accounting", negatives);
    }

    let order = order_descending(&lambda);
    let k = n_components.min(order.len());

    let mut coordinates = DMatrix::zeros(n, k);
    for (axis, &c) in order.iter().take(k).enumerate() {
        let scale = lambda[c].max(0.0).sqrt();
        coordinates.set_column(axis, &(eig.eigenvectors.column(c) * scale));
    }
    fix_signs(&mut coordinates);

    let eigenvalues: Vec<f64> = order.iter().take(k).map(|&c| lambda[c]).collect();
    let proportion_explained = eigenvalues.iter().map(|l| l.max(0.0) / positive_total).collect();

    Ok(OrdinationResult {
        method: "PCoA".to_string(),
        sample_ids: distance.ids().to_vec(),
        axis_labels: (1..=k).map(|i| format!("PCoA{}", i)).collect(),
        coordinates,
        eigenvalues,
        proportion_explained,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("S{}", i)).collect()
    }

    #[test]
    fn test_pcoa_recovers_line() {
        // points at 0, 1, 3 on a line
        let pos: [f64; 3] = [0.0, 1.0, 3.0];
        let data = DMatrix::from_fn(3, 3, |i, j| (pos[i] - pos[j]).abs());
        let dm = DissimilarityMatrix::new(data, ids(3)).unwrap();
        let res = pcoa(&dm, 2).unwrap();

        assert_eq!(res.axis_labels, vec!["PCoA1", "PCoA2"]);
        assert_relative_eq!(res.proportion_explained[0], 1.0, epsilon = 1e-10);
        let axis: Vec<f64> = res.coordinates.column(0).iter().copied().collect();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!((axis[i] - axis[j]).abs(), dm.get(i, j), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_pcoa_variance_sorted() {
        let data = DMatrix::from_row_slice(
            4,
            4,
            &[
                0.0, 0.3, 0.8, 0.6, //
                0.3, 0.0, 0.5, 0.9, //
                0.8, 0.5, 0.0, 0.4, //
                0.6, 0.9, 0.4, 0.0,
            ],
        );
        let dm = DissimilarityMatrix::new(data, ids(4)).unwrap();
        let res = pcoa(&dm, 4).unwrap();
        assert_eq!(res.n_axes(), 4);
        for w in res.proportion_explained.windows(2) {
            assert!(w[0] >= w[1]);
        }
        assert!(res.proportion_explained.iter().all(|&p| p >= 0.0));
        assert!(res.proportion_explained.iter().sum::<f64>() <= 1.0 + 1e-10);
    }

    #[test]
    fn test_pcoa_insufficient_samples() {
        let dm = DissimilarityMatrix::new(DMatrix::zeros(2, 2), ids(2)).unwrap();
        assert!(matches!(
            pcoa(&dm, 2),
            Err(AbrgError::InsufficientSamples { required: 3, actual: 2 })
        ));
    }
}

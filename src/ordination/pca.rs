//! Principal component analysis.

use super::{check_sample_count, fix_signs, order_descending, OrdinationResult};
use crate::data::AbundanceMatrix;
use crate::error::{AbrgError, Result};
use nalgebra::DMatrix;

/// PCA of the samples.
///
/// Each feature is centered across samples, the samples × features matrix
/// is decomposed by thin SVD, and coordinates are the leading left singular
/// vectors scaled by their singular values. `n_components` is clamped to
/// min(samples, features).
pub fn pca(matrix: &AbundanceMatrix, n_components: usize) -> Result<OrdinationResult> {
    let n = matrix.n_samples();
    check_sample_count(n)?;

    // samples × features, centered per feature
    let mut x: DMatrix<f64> = matrix.matrix().transpose();
    for mut col in x.column_iter_mut() {
        let mean = col.mean();
        col.add_scalar_mut(-mean);
    }

    let svd = x.svd(true, false);
    let u = svd
        .u
        .ok_or_else(|| AbrgError::DegenerateInput("SVD did not produce left singular vectors".into()))?;
    let sigma: Vec<f64> = svd.singular_values.iter().copied().collect();

    let total: f64 = sigma.iter().map(|s| s * s).sum();
    if total <= 0.0 {
        return Err(AbrgError::DegenerateInput(
            "abundance matrix has zero variance across samples".into(),
        ));
    }

    let order = order_descending(&sigma);
    let k = n_components.min(order.len());
    log::debug!("PCA: {} samples, {} features, {} axes", n, matrix.n_features(), k);

    let mut coordinates = DMatrix::zeros(n, k);
    for (axis, &c) in order.iter().take(k).enumerate() {
        coordinates.set_column(axis, &(u.column(c) * sigma[c]));
    }
    fix_signs(&mut coordinates);

    let eigenvalues: Vec<f64> = order.iter().take(k).map(|&c| sigma[c] * sigma[c]).collect();
    let proportion_explained = eigenvalues.iter().map(|e| e / total).collect();

    Ok(OrdinationResult {
        method: "PCA".to_string(),
        sample_ids: matrix.sample_ids().to_vec(),
        axis_labels: (1..=k).map(|i| format!("PC{}", i)).collect(),
        coordinates,
        eigenvalues,
        proportion_explained,
    })
}

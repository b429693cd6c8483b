//! Total Sum Scaling (TSS) normalization to relative abundance.
//!
//! TSS converts counts to relative abundances by dividing each value by the
//! total of its sample. Relative abundance feeds ordination, the distance
//! engine and the co-occurrence network.

use crate::data::AbundanceMatrix;
use crate::error::{AbrgError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Apply Total Sum Scaling with a scale factor.
///
/// # Formula
/// For sample j: TSS(x_ij) = x_ij / sum(x_j) * scale_factor
///
/// # Errors
/// `DegenerateInput` when a sample has zero total, since its proportions
/// are undefined.
pub fn norm_tss(matrix: &AbundanceMatrix, scale_factor: f64) -> Result<AbundanceMatrix> {
    let n_features = matrix.n_features();
    let n_samples = matrix.n_samples();

    if n_features == 0 || n_samples == 0 {
        return Err(AbrgError::EmptyData(
            "Cannot apply TSS to empty matrix".to_string(),
        ));
    }

    if scale_factor <= 0.0 {
        return Err(AbrgError::InvalidParameter(
            "Scale factor must be positive".to_string(),
        ));
    }

    let library_sizes = matrix.col_sums();
    for (j, &lib_size) in library_sizes.iter().enumerate() {
        if lib_size == 0.0 {
            return Err(AbrgError::DegenerateInput(format!(
                "Sample {} has zero total abundance, cannot normalize",
                matrix.sample_ids()[j]
            )));
        }
    }

    let normalized_cols: Vec<Vec<f64>> = (0..n_samples)
        .into_par_iter()
        .map(|j| {
            let lib_size = library_sizes[j];
            (0..n_features)
                .map(|i| matrix.get(i, j) / lib_size * scale_factor)
                .collect()
        })
        .collect();

    let data = DMatrix::from_fn(n_features, n_samples, |i, j| normalized_cols[j][i]);
    AbundanceMatrix::new(
        data,
        matrix.feature_ids().to_vec(),
        matrix.sample_ids().to_vec(),
    )
}

/// Convert to relative abundance: every sample column sums to 1.
pub fn relative_abundance(matrix: &AbundanceMatrix) -> Result<AbundanceMatrix> {
    norm_tss(matrix, scale::PROPORTION)
}

/// Common scale factors for TSS normalization.
pub mod scale {
    /// Proportions (sum to 1.0 per sample).
    pub const PROPORTION: f64 = 1.0;
    /// Counts per million (CPM).
    pub const CPM: f64 = 1_000_000.0;
    /// Counts per 100 (percentages).
    pub const PERCENT: f64 = 100.0;
}

//! Sample-by-sample dissimilarity matrix.

use super::metric::DistanceMetric;
use crate::data::AbundanceMatrix;
use crate::error::{AbrgError, Result};
use crate::io;
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Tolerance used when checking symmetry of externally supplied matrices.
const SYMMETRY_TOL: f64 = 1e-10;

/// A symmetric, zero-diagonal, non-negative dissimilarity matrix.
///
/// Both axes are indexed by the same ordered sample IDs. Instances are only
/// produced by [`beta_diversity`] or validated by [`DissimilarityMatrix::new`],
/// and are never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DissimilarityMatrix {
    data: DMatrix<f64>,
    ids: Vec<String>,
    index: HashMap<String, usize>,
    metric: Option<DistanceMetric>,
}

impl DissimilarityMatrix {
    /// Wrap a precomputed square matrix after checking the dissimilarity
    /// invariants.
    pub fn new(data: DMatrix<f64>, ids: Vec<String>) -> Result<Self> {
        if data.nrows() != data.ncols() {
            return Err(AbrgError::DimensionMismatch {
                expected: data.nrows(),
                actual: data.ncols(),
            });
        }
        if data.nrows() != ids.len() {
            return Err(AbrgError::DimensionMismatch {
                expected: data.nrows(),
                actual: ids.len(),
            });
        }
        let n = ids.len();
        for i in 0..n {
            if data[(i, i)] != 0.0 {
                return Err(AbrgError::Validation(format!(
                    "non-zero diagonal for '{}'",
                    ids[i]
                )));
            }
            for j in (i + 1)..n {
                let d = data[(i, j)];
                if !d.is_finite() || d < 0.0 {
                    return Err(AbrgError::Validation(format!(
                        "invalid dissimilarity {} between '{}' and '{}'",
                        d, ids[i], ids[j]
                    )));
                }
                if (d - data[(j, i)]).abs() > SYMMETRY_TOL {
                    return Err(AbrgError::Validation(format!(
                        "matrix is not symmetric at ('{}', '{}')",
                        ids[i], ids[j]
                    )));
                }
            }
        }
        Self::assemble(data, ids, None)
    }

    fn assemble(data: DMatrix<f64>, ids: Vec<String>, metric: Option<DistanceMetric>) -> Result<Self> {
        let mut index = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(AbrgError::DuplicateId(id.clone()));
            }
        }
        Ok(Self {
            data,
            ids,
            index,
            metric,
        })
    }

    /// Number of samples on each axis.
    #[inline]
    pub fn n(&self) -> usize {
        self.ids.len()
    }

    /// Sample IDs in axis order.
    #[inline]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Metric the matrix was computed with, if known.
    pub fn metric(&self) -> Option<DistanceMetric> {
        self.metric
    }

    /// Dissimilarity between samples at positions `i` and `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[(i, j)]
    }

    /// Dissimilarity between two samples by ID.
    pub fn get_by_id(&self, a: &str, b: &str) -> Option<f64> {
        let i = *self.index.get(a)?;
        let j = *self.index.get(b)?;
        Some(self.data[(i, j)])
    }

    /// Position of a sample on the axes.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Underlying square matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Condensed upper triangle (row-major, diagonal excluded), of length
    /// n(n−1)/2.
    pub fn condensed(&self) -> Vec<f64> {
        let n = self.n();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                out.push(self.data[(i, j)]);
            }
        }
        out
    }

    /// Restrict to the given sample positions, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        let ids = indices
            .iter()
            .map(|&i| {
                self.ids.get(i).cloned().ok_or(AbrgError::DimensionMismatch {
                    expected: self.n(),
                    actual: i,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let data = DMatrix::from_fn(indices.len(), indices.len(), |r, c| {
            self.data[(indices[r], indices[c])]
        });
        Self::assemble(data, ids, self.metric)
    }

    /// Write the square matrix with a leading ID column.
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = io::create_writer(path)?;
        let mut header = Vec::with_capacity(self.n() + 1);
        header.push(String::new());
        header.extend(self.ids.iter().cloned());
        writer.write_record(&header)?;
        for (i, id) in self.ids.iter().enumerate() {
            let mut record = Vec::with_capacity(self.n() + 1);
            record.push(id.clone());
            record.extend(self.data.row(i).iter().map(|&d| io::fmt_f64(d)));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Compute the pairwise dissimilarity between all samples.
///
/// Fails with `DegenerateInput` when any sample has zero abundance across
/// every feature.
pub fn beta_diversity(matrix: &AbundanceMatrix, metric: DistanceMetric) -> Result<DissimilarityMatrix> {
    let n = matrix.n_samples();
    if let Some(j) = matrix.col_sums().iter().position(|&s| s == 0.0) {
        return Err(AbrgError::DegenerateInput(format!(
            "sample '{}' has zero abundance across all features",
            matrix.sample_ids()[j]
        )));
    }
    log::debug!("computing {} dissimilarity over {} samples", metric, n);

    let profiles: Vec<Vec<f64>> = (0..n).map(|j| matrix.col(j)).collect();
    let upper: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            ((i + 1)..n)
                .map(|j| metric.compute(&profiles[i], &profiles[j]))
                .collect()
        })
        .collect();

    let mut data = DMatrix::zeros(n, n);
    for (i, row) in upper.iter().enumerate() {
        for (offset, &d) in row.iter().enumerate() {
            let j = i + 1 + offset;
            data[(i, j)] = d;
            data[(j, i)] = d;
        }
    }

    DissimilarityMatrix::assemble(data, matrix.sample_ids().to_vec(), Some(metric))
}

/// Bray-Curtis dissimilarity between all samples.
pub fn bray_curtis(matrix: &AbundanceMatrix) -> Result<DissimilarityMatrix> {
    beta_diversity(matrix, DistanceMetric::BrayCurtis)
}

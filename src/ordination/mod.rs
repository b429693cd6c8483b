//! Low-dimensional sample ordination.
//!
//! - **PCA**: SVD of the feature-centered abundance matrix
//! - **PCoA**: classical multidimensional scaling of a dissimilarity matrix
//!
//! Both return an [`OrdinationResult`] with axes sorted by decreasing
//! explained variance.

mod pca;
mod pcoa;

pub use pca::pca;
pub use pcoa::pcoa;

use crate::error::{AbrgError, Result};
use crate::io;
use nalgebra::DMatrix;
use std::path::Path;

/// Minimum number of samples either decomposition accepts.
pub const MIN_SAMPLES: usize = 3;

/// Sample coordinates on the leading ordination axes.
#[derive(Debug, Clone)]
pub struct OrdinationResult {
    /// "PCA" or "PCoA".
    pub method: String,
    /// Sample IDs, one per coordinate row.
    pub sample_ids: Vec<String>,
    /// Axis labels (`PC1`, `PC2`, ... or `PCoA1`, ...).
    pub axis_labels: Vec<String>,
    /// Samples × axes coordinate matrix.
    pub coordinates: DMatrix<f64>,
    /// Variance captured by each axis (σ² for PCA, λ for PCoA).
    pub eigenvalues: Vec<f64>,
    /// Share of total variance per axis.
    pub proportion_explained: Vec<f64>,
}

impl OrdinationResult {
    /// Number of retained axes.
    pub fn n_axes(&self) -> usize {
        self.axis_labels.len()
    }

    /// Coordinates of one sample.
    pub fn sample_coordinates(&self, sample_id: &str) -> Option<Vec<f64>> {
        let i = self.sample_ids.iter().position(|s| s == sample_id)?;
        Some(self.coordinates.row(i).iter().copied().collect())
    }

    /// Write `sample_id,<axis labels...>` rows.
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = io::create_writer(path)?;
        let mut header = vec!["sample_id".to_string()];
        header.extend(self.axis_labels.iter().cloned());
        writer.write_record(&header)?;
        for (i, sid) in self.sample_ids.iter().enumerate() {
            let mut record = vec![sid.clone()];
            record.extend(self.coordinates.row(i).iter().map(|&x| io::fmt_f64(x)));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write `axis,proportion` rows.
    pub fn write_variance<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = io::create_writer(path)?;
        writer.write_record(["axis", "proportion"])?;
        for (label, p) in self.axis_labels.iter().zip(&self.proportion_explained) {
            writer.write_record([label.as_str(), io::fmt_f64(*p).as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn check_sample_count(n: usize) -> Result<()> {
    if n < MIN_SAMPLES {
        return Err(AbrgError::InsufficientSamples {
            required: MIN_SAMPLES,
            actual: n,
        });
    }
    Ok(())
}

/// Indices of `values` sorted descending; equal values keep their order.
fn order_descending(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    idx
}

/// Flip each column so that its largest-magnitude entry is positive.
fn fix_signs(coords: &mut DMatrix<f64>) {
    for mut col in coords.column_iter_mut() {
        let mut pivot = 0.0_f64;
        for &x in col.iter() {
            if x.abs() > pivot.abs() {
                pivot = x;
            }
        }
        if pivot < 0.0 {
            col.neg_mut();
        }
    }
}

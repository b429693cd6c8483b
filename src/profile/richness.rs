//! Feature richness per sample.

use crate::data::AbundanceMatrix;
use crate::error::Result;
use crate::io;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of features present (> 0) in each sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Richness {
    /// Sample identifiers, in matrix order.
    pub sample_ids: Vec<String>,
    /// Present-feature count per sample.
    pub counts: Vec<usize>,
    /// Number of features in the source matrix (upper bound of every count).
    pub n_features: usize,
}

impl Richness {
    /// Richness of a single sample.
    pub fn get(&self, sample_id: &str) -> Option<usize> {
        let idx = self.sample_ids.iter().position(|s| s == sample_id)?;
        self.counts.get(idx).copied()
    }

    /// Write `sample_id,ko_richness` rows.
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = io::create_writer(path)?;
        writer.write_record(["sample_id", "ko_richness"])?;
        for (sid, count) in self.sample_ids.iter().zip(&self.counts) {
            writer.write_record([sid.as_str(), count.to_string().as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Count the features present in each sample.
pub fn richness(matrix: &AbundanceMatrix) -> Richness {
    let counts = matrix
        .matrix()
        .column_iter()
        .map(|col| col.iter().filter(|&&v| v > 0.0).count())
        .collect();

    Richness {
        sample_ids: matrix.sample_ids().to_vec(),
        counts,
        n_features: matrix.n_features(),
    }
}

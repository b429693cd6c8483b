//! Prevalence profiling for abundance matrices.

use crate::data::AbundanceMatrix;
use serde::{Deserialize, Serialize};

/// Profile of prevalence characteristics in an abundance matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrevalenceProfile {
    pub n_features: usize,
    pub n_samples: usize,
    /// Prevalence (proportion of non-zero samples) per feature.
    pub feature_prevalence: Vec<f64>,
    pub mean_prevalence: f64,
    /// Number of features present in all samples.
    pub n_ubiquitous: usize,
    /// Number of features absent from every sample.
    pub n_absent: usize,
}

impl PrevalenceProfile {
    /// Get features at or above a prevalence threshold.
    pub fn features_above(&self, threshold: f64) -> Vec<usize> {
        self.feature_prevalence
            .iter()
            .enumerate()
            .filter(|(_, &p)| p >= threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

impl std::fmt::Display for PrevalenceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} features x {} samples, mean prevalence {:.1}%, {} ubiquitous, {} absent",
            self.n_features,
            self.n_samples,
            self.mean_prevalence * 100.0,
            self.n_ubiquitous,
            self.n_absent
        )
    }
}

/// Profile prevalence characteristics of an abundance matrix.
pub fn profile_prevalence(matrix: &AbundanceMatrix) -> PrevalenceProfile {
    let feature_prevalence = matrix.prevalence();
    let n_features = feature_prevalence.len();

    let mean_prevalence = if n_features > 0 {
        feature_prevalence.iter().sum::<f64>() / n_features as f64
    } else {
        0.0
    };

    PrevalenceProfile {
        n_features,
        n_samples: matrix.n_samples(),
        n_ubiquitous: feature_prevalence.iter().filter(|&&p| p >= 1.0).count(),
        n_absent: feature_prevalence.iter().filter(|&&p| p == 0.0).count(),
        feature_prevalence,
        mean_prevalence,
    }
}

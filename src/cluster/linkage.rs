//! Linkage criteria and their Lance–Williams update rules.

use crate::error::AbrgError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inter-cluster distance criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Single,
    Complete,
    /// UPGMA.
    #[default]
    Average,
    /// WPGMA.
    Weighted,
    /// UPGMC.
    Centroid,
    /// WPGMC.
    Median,
    /// Ward's minimum variance.
    Ward,
}

impl Linkage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Complete => "complete",
            Self::Average => "average",
            Self::Weighted => "weighted",
            Self::Centroid => "centroid",
            Self::Median => "median",
            Self::Ward => "ward",
        }
    }

    /// Distance from the union of clusters `i` and `j` to cluster `k`.
    ///
    /// `d_ik`, `d_jk`, `d_ij` are the current pairwise distances and
    /// `n_i`, `n_j`, `n_k` the cluster sizes.
    pub fn update(&self, d_ik: f64, d_jk: f64, d_ij: f64, n_i: f64, n_j: f64, n_k: f64) -> f64 {
        match self {
            Self::Single => d_ik.min(d_jk),
            Self::Complete => d_ik.max(d_jk),
            Self::Average => (n_i * d_ik + n_j * d_jk) / (n_i + n_j),
            Self::Weighted => 0.5 * (d_ik + d_jk),
            Self::Centroid => {
                let n_ij = n_i + n_j;
                let sq = (n_i * d_ik * d_ik + n_j * d_jk * d_jk) / n_ij - n_i * n_j * d_ij * d_ij / (n_ij * n_ij);
                sq.max(0.0).sqrt()
            }
            Self::Median => {
                let sq = 0.5 * d_ik * d_ik + 0.5 * d_jk * d_jk - 0.25 * d_ij * d_ij;
                sq.max(0.0).sqrt()
            }
            Self::Ward => {
                let total = n_i + n_j + n_k;
                let sq = ((n_i + n_k) * d_ik * d_ik + (n_j + n_k) * d_jk * d_jk - n_k * d_ij * d_ij) / total;
                sq.max(0.0).sqrt()
            }
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Linkage {
    type Err = AbrgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "complete" => Ok(Self::Complete),
            "average" | "upgma" => Ok(Self::Average),
            "weighted" | "wpgma" => Ok(Self::Weighted),
            "centroid" | "upgmc" => Ok(Self::Centroid),
            "median" | "wpgmc" => Ok(Self::Median),
            "ward" => Ok(Self::Ward),
            _ => Err(AbrgError::InvalidLinkage(s.to_string())),
        }
    }
}

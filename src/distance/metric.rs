//! Pairwise dissimilarity metrics between sample profiles.

use crate::error::AbrgError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported dissimilarity metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Σ|u−v| / Σ(u+v), bounded in [0, 1] for non-negative data.
    BrayCurtis,
    /// Binary Jaccard distance on presence/absence, bounded in [0, 1].
    Jaccard,
    /// Euclidean (L2) distance.
    Euclidean,
    /// Manhattan (city-block, L1) distance.
    Manhattan,
}

impl DistanceMetric {
    /// Canonical name, as accepted by `FromStr`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BrayCurtis => "braycurtis",
            Self::Jaccard => "jaccard",
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
        }
    }

    /// Upper bound of the metric's range, if bounded.
    pub fn upper_bound(&self) -> Option<f64> {
        match self {
            Self::BrayCurtis | Self::Jaccard => Some(1.0),
            Self::Euclidean | Self::Manhattan => None,
        }
    }

    /// Distance between two equally long profiles.
    pub fn compute(&self, u: &[f64], v: &[f64]) -> f64 {
        debug_assert_eq!(u.len(), v.len());
        match self {
            Self::BrayCurtis => {
                let (num, den) = u.iter().zip(v).fold((0.0, 0.0), |(num, den), (a, b)| {
                    (num + (a - b).abs(), den + (a + b).abs())
                });
                if den == 0.0 {
                    0.0
                } else {
                    num / den
                }
            }
            Self::Jaccard => {
                let (differ, either) = u.iter().zip(v).fold((0usize, 0usize), |(d, e), (a, b)| {
                    let pa = *a != 0.0;
                    let pb = *b != 0.0;
                    (d + usize::from(pa != pb), e + usize::from(pa || pb))
                });
                if either == 0 {
                    0.0
                } else {
                    differ as f64 / either as f64
                }
            }
            Self::Euclidean => u
                .iter()
                .zip(v)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt(),
            Self::Manhattan => u.iter().zip(v).map(|(a, b)| (a - b).abs()).sum(),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = AbrgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "braycurtis" | "bray_curtis" | "bray-curtis" | "bray" => Ok(Self::BrayCurtis),
            "jaccard" => Ok(Self::Jaccard),
            "euclidean" => Ok(Self::Euclidean),
            "manhattan" | "cityblock" => Ok(Self::Manhattan),
            _ => Err(AbrgError::InvalidMetric(s.to_string())),
        }
    }
}

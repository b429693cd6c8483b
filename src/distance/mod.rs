//! Between-sample dissimilarity.
//!
//! - **Bray-Curtis**: abundance-weighted, bounded in [0, 1]
//! - **Jaccard**: presence/absence, bounded in [0, 1]
//! - **Euclidean** and **Manhattan**: unbounded geometric distances

mod matrix;
mod metric;

pub use matrix::{beta_diversity, bray_curtis, DissimilarityMatrix};
pub use metric::DistanceMetric;

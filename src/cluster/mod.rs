//! Hierarchical clustering of samples.

mod hclust;
mod linkage;
mod tree;

pub use hclust::hierarchical_clustering;
pub use linkage::Linkage;
pub use tree::{MergeStep, MergeTree};

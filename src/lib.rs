//! Wastewater resistome (ABRG) analysis library
//!
//! Statistics for antibiotic-resistance gene abundance tables collected from
//! wastewater treatment plants: normalization, beta diversity, ordination,
//! differential abundance, clustering, group-separation testing,
//! co-occurrence networks and annotated top-feature selection.
//!
//! # Overview
//!
//! - **data**: Abundance matrix, sample metadata, feature annotations, stratified tables
//! - **normalize**: Total sum scaling to relative abundance
//! - **profile**: Prevalence, richness and top-feature summaries
//! - **distance**: Pairwise dissimilarity matrices (Bray-Curtis, Jaccard, ...)
//! - **ordination**: PCA and PCoA
//! - **differential**: Two-group per-feature tests with FDR correction
//! - **cluster**: Agglomerative hierarchical clustering
//! - **test**: Welch, Mann-Whitney, Spearman and PERMANOVA
//! - **correct**: Benjamini-Hochberg correction
//! - **network**: Spearman co-occurrence networks
//! - **select**: Annotated top-N feature selection and Table 1
//! - **validate**: Input consistency checks
//! - **pipeline**: YAML-configured end-to-end runs
//!
//! # Example
//!
//! ```no_run
//! use wwtp_abrg::prelude::*;
//!
//! let counts = AbundanceMatrix::from_path("ko_abundance.csv").unwrap();
//! let metadata = Metadata::from_path("sample_metadata.csv").unwrap();
//!
//! let relative = relative_abundance(&counts).unwrap();
//! let distances = bray_curtis(&relative).unwrap();
//! let result = permanova(&distances, &metadata, "period", &PermanovaConfig::default()).unwrap();
//! println!("pseudo-F = {:.3}, p = {:.3}", result.statistic, result.p_value);
//! ```

pub mod cluster;
pub mod correct;
pub mod data;
pub mod differential;
pub mod distance;
pub mod error;
pub mod io;
pub mod network;
pub mod normalize;
pub mod ordination;
pub mod pipeline;
pub mod profile;
pub mod select;
pub mod test;
pub mod validate;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::cluster::{hierarchical_clustering, Linkage, MergeStep, MergeTree};
    pub use crate::correct::{correct_bh, BhCorrected};
    pub use crate::data::{
        AbundanceMatrix, AnnotationTable, Metadata, StratifiedTable, TaxonContribution, Variable,
        VariableType,
    };
    pub use crate::differential::{
        differential_abundance, Comparison, DifferentialResult, DifferentialRow, TestMethod,
    };
    pub use crate::distance::{beta_diversity, bray_curtis, DissimilarityMatrix, DistanceMetric};
    pub use crate::error::{AbrgError, Result};
    pub use crate::network::{spearman_network, NetworkEdge, NetworkEdgeSet};
    pub use crate::normalize::{norm_tss, relative_abundance};
    pub use crate::ordination::{pca, pcoa, OrdinationResult};
    pub use crate::pipeline::{run_pipeline, PipelineConfig, PipelineReport};
    pub use crate::profile::{profile_prevalence, richness, top_features_over_time, PrevalenceProfile, Richness};
    pub use crate::select::{
        build_table1, select_top_features, AttributeFilter, FeatureSelection, SelectionConfig, Table1Row,
    };
    pub use crate::test::{
        mann_whitney_u, permanova, spearman, welch_t_test, Correlation, PermanovaConfig, PermanovaResult,
        TwoSampleTest,
    };
}

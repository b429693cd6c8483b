//! Statistical hypothesis tests.
//!
//! - **Welch t-test**: parametric two-sample test with unequal variances
//! - **Mann-Whitney U**: non-parametric rank-sum test
//! - **Spearman**: rank correlation with t-distribution p-value
//! - **PERMANOVA**: permutation test of group separation on a dissimilarity matrix

pub mod mann_whitney;

pub use mann_whitney::mann_whitney_u;
pub use permanova::{permanova, PermanovaConfig, PermanovaResult};
pub use rank::rank_average;
pub use spearman::{spearman, Correlation};
pub use welch::welch_t_test;

/// Statistic and two-sided p-value of a two-sample test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoSampleTest {
    pub statistic: f64,
    pub p_value: f64,
}

impl TwoSampleTest {
    /// Result for a test that cannot be computed on the given samples.
    pub fn undefined() -> Self {
        Self {
            statistic: f64::NAN,
            p_value: f64::NAN,
        }
    }
}

//! Descriptive summaries of abundance matrices.

mod prevalence;
mod richness;
mod temporal;

pub use prevalence::{profile_prevalence, PrevalenceProfile};
pub use richness::{richness, Richness};
pub use temporal::{time_series, top_features_over_time, write_time_series, TimeSeriesPoint};

/// Order feature indices by mean abundance, highest first, ties broken by
/// feature ID ascending.
pub(crate) fn order_by_mean_desc(means: &[f64], ids: &[String], mut candidates: Vec<usize>) -> Vec<usize> {
    candidates.sort_by(|&a, &b| means[b].total_cmp(&means[a]).then_with(|| ids[a].cmp(&ids[b])));
    candidates
}

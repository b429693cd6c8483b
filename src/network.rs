//! Spearman co-occurrence networks between features.

use crate::data::AbundanceMatrix;
use crate::error::Result;
use crate::io;
use crate::test::spearman::{correlation_p_value, rho_from_standardized, standardized_ranks};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Undirected edge between two features; `source < target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    pub rho: f64,
    pub p_value: f64,
}

/// Set of retained co-occurrence edges, sorted by (source, target).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkEdgeSet {
    pub edges: Vec<NetworkEdge>,
}

impl NetworkEdgeSet {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edge between two features, in either order.
    pub fn get(&self, a: &str, b: &str) -> Option<&NetworkEdge> {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        self.edges
            .iter()
            .find(|e| e.source == source && e.target == target)
    }

    /// Number of edges touching each feature, sorted by feature ID.
    pub fn degrees(&self) -> Vec<(String, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for edge in &self.edges {
            *counts.entry(edge.source.clone()).or_insert(0) += 1;
            *counts.entry(edge.target.clone()).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }

    /// Write `source,target,rho,p_value` rows.
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = io::create_writer(path)?;
        writer.write_record(["source", "target", "rho", "p_value"])?;
        for edge in &self.edges {
            writer.write_record([
                edge.source.as_str(),
                edge.target.as_str(),
                io::fmt_f64(edge.rho).as_str(),
                io::fmt_f64(edge.p_value).as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Correlate every unordered pair of features across samples.
///
/// An edge is kept when |ρ| ≥ `r_threshold` and p ≤ `p_threshold`. Features
/// that are constant across samples have no defined ρ and never appear.
/// No multiple-testing correction is applied.
pub fn spearman_network(matrix: &AbundanceMatrix, r_threshold: f64, p_threshold: f64) -> NetworkEdgeSet {
    let n_samples = matrix.n_samples();
    let ids = matrix.feature_ids();

    // rank each feature once
    let ranked: Vec<Option<Vec<f64>>> = (0..matrix.n_features())
        .into_par_iter()
        .map(|i| standardized_ranks(&matrix.row(i)))
        .collect();
    let n_constant = ranked.iter().filter(|r| r.is_none()).count();

    let mut edges: Vec<NetworkEdge> = (0..ranked.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let ranked = &ranked;
            (i + 1..ranked.len()).filter_map(move |j| {
                let x = ranked[i].as_ref()?;
                let y = ranked[j].as_ref()?;
                let rho = rho_from_standardized(x, y);
                let p_value = correlation_p_value(rho, n_samples);
                if rho.abs() >= r_threshold && p_value <= p_threshold {
                    let (source, target) = if ids[i] <= ids[j] { (i, j) } else { (j, i) };
                    Some(NetworkEdge {
                        source: ids[source].clone(),
                        target: ids[target].clone(),
                        rho,
                        p_value,
                    })
                } else {
                    None
                }
            })
        })
        .collect();

    edges.sort_by(|a, b| a.source.cmp(&b.source).then_with(|| a.target.cmp(&b.target)));
    log::debug!(
        "network: {} features ({} constant), {} edges",
        ranked.len(),
        n_constant,
        edges.len()
    );
    NetworkEdgeSet { edges }
}

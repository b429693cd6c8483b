//! Agglomerative merge tree.

use crate::error::{AbrgError, Result};
use crate::io;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One agglomeration step.
///
/// Leaves carry IDs `0..n`; the cluster formed at step `i` gets ID `n + i`.
/// `cluster_a` is always the smaller of the two merged IDs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeStep {
    pub cluster_a: usize,
    pub cluster_b: usize,
    pub distance: f64,
    /// Number of leaves in the new cluster.
    pub size: usize,
}

/// Ordered sequence of merges ending in a single root cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeTree {
    /// Leaf labels (sample IDs) in input order.
    pub labels: Vec<String>,
    pub steps: Vec<MergeStep>,
}

impl MergeTree {
    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.labels.len()
    }

    /// Leaf indices in dendrogram order (left-to-right traversal from the
    /// root, `cluster_a` before `cluster_b`).
    pub fn leaf_order(&self) -> Vec<usize> {
        let n = self.n_leaves();
        let Some(root) = self.steps.len().checked_sub(1).map(|i| n + i) else {
            return (0..n).collect();
        };

        let mut order = Vec::with_capacity(n);
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if id < n {
                order.push(id);
            } else {
                let step = &self.steps[id - n];
                stack.push(step.cluster_b);
                stack.push(step.cluster_a);
            }
        }
        order
    }

    /// Leaf labels in dendrogram order.
    pub fn ordered_labels(&self) -> Vec<&str> {
        self.leaf_order().into_iter().map(|i| self.labels[i].as_str()).collect()
    }

    /// Flat clustering into at most `k` clusters by undoing the last k−1
    /// merges.
    ///
    /// Returns one label per leaf (input order), numbered from 1 in order of
    /// first appearance along the dendrogram.
    pub fn cut(&self, k: usize) -> Result<Vec<usize>> {
        if k == 0 {
            return Err(AbrgError::InvalidParameter("cluster count must be at least 1".into()));
        }
        let n = self.n_leaves();
        let n_merges = n.saturating_sub(k).min(self.steps.len());

        // union-find over leaves
        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        // representative leaf of every cluster ID formed so far
        let mut representative: Vec<usize> = (0..n).collect();
        for step in &self.steps[..n_merges] {
            let ra = find(&mut parent, representative[step.cluster_a]);
            let rb = find(&mut parent, representative[step.cluster_b]);
            parent[rb] = ra;
            representative.push(ra);
        }

        let mut labels = vec![0usize; n];
        let mut root_label = vec![0usize; n];
        let mut next = 1;
        for leaf in self.leaf_order() {
            let root = find(&mut parent, leaf);
            if root_label[root] == 0 {
                root_label[root] = next;
                next += 1;
            }
            labels[leaf] = root_label[root];
        }
        Ok(labels)
    }

    /// Write `cluster1,cluster2,distance,count` rows.
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = io::create_writer(path)?;
        writer.write_record(["cluster1", "cluster2", "distance", "count"])?;
        for step in &self.steps {
            writer.write_record([
                step.cluster_a.to_string(),
                step.cluster_b.to_string(),
                io::fmt_f64(step.distance),
                step.size.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

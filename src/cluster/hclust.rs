//! Agglomerative hierarchical clustering of samples.

use super::linkage::Linkage;
use super::tree::{MergeStep, MergeTree};
use crate::distance::DissimilarityMatrix;
use crate::error::{AbrgError, Result};

/// Position of pair (u, v), u < v, in a condensed vector over n points.
#[inline]
fn condensed_index(n: usize, u: usize, v: usize) -> usize {
    debug_assert!(u < v && v < n);
    u * (n - 1) - (u * (u + 1)) / 2 + (v - u - 1)
}

/// Build the merge tree of `distance` under `linkage`.
///
/// Works on the condensed upper triangle, updating inter-cluster distances
/// with the Lance–Williams rule of the chosen linkage. When several pairs
/// are equally close, the first pair in row-major scan order is merged.
pub fn hierarchical_clustering(distance: &DissimilarityMatrix, linkage: Linkage) -> Result<MergeTree> {
    let n = distance.n();
    if n < 2 {
        return Err(AbrgError::InsufficientSamples {
            required: 2,
            actual: n,
        });
    }

    let mut dist = distance.condensed();
    // slot -> (cluster ID, size); merged clusters occupy the lower slot
    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes: Vec<usize> = vec![1; n];
    let mut active: Vec<bool> = vec![true; n];
    let mut steps = Vec::with_capacity(n - 1);

    for step in 0..(n - 1) {
        let mut best = (usize::MAX, usize::MAX, f64::INFINITY);
        for i in (0..n).filter(|&i| active[i]) {
            for j in ((i + 1)..n).filter(|&j| active[j]) {
                let d = dist[condensed_index(n, i, j)];
                if d < best.2 || best.0 == usize::MAX {
                    best = (i, j, d);
                }
            }
        }
        let (i, j, d_ij) = best;

        let (n_i, n_j) = (sizes[i] as f64, sizes[j] as f64);
        for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
            let ik = if i < k { condensed_index(n, i, k) } else { condensed_index(n, k, i) };
            let jk = if j < k { condensed_index(n, j, k) } else { condensed_index(n, k, j) };
            dist[ik] = linkage.update(dist[ik], dist[jk], d_ij, n_i, n_j, sizes[k] as f64);
        }

        let (a, b) = (ids[i].min(ids[j]), ids[i].max(ids[j]));
        let size = sizes[i] + sizes[j];
        steps.push(MergeStep {
            cluster_a: a,
            cluster_b: b,
            distance: d_ij,
            size,
        });

        ids[i] = n + step;
        sizes[i] = size;
        active[j] = false;
    }
    log::debug!("{} clustering: {} merges over {} samples", linkage, steps.len(), n);

    Ok(MergeTree {
        labels: distance.ids().to_vec(),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn line(pos: &[f64]) -> DissimilarityMatrix {
        let n = pos.len();
        let data = DMatrix::from_fn(n, n, |i, j| (pos[i] - pos[j]).abs());
        DissimilarityMatrix::new(data, (0..n).map(|i| format!("S{}", i)).collect()).unwrap()
    }

    #[test]
    fn test_condensed_index() {
        // n = 4: (0,1) (0,2) (0,3) (1,2) (1,3) (2,3)
        assert_eq!(condensed_index(4, 0, 1), 0);
        assert_eq!(condensed_index(4, 0, 3), 2);
        assert_eq!(condensed_index(4, 1, 2), 3);
        assert_eq!(condensed_index(4, 2, 3), 5);
    }

    #[test]
    fn test_average_linkage() {
        // points 0, 1, 5, 6, 20
        let tree = hierarchical_clustering(&line(&[0.0, 1.0, 5.0, 6.0, 20.0]), Linkage::Average).unwrap();
        assert_eq!(tree.steps.len(), 4);

        // ties at distance 1 resolve to (0, 1) first
        assert_eq!((tree.steps[0].cluster_a, tree.steps[0].cluster_b), (0, 1));
        assert_eq!((tree.steps[1].cluster_a, tree.steps[1].cluster_b), (2, 3));
        assert_eq!((tree.steps[2].cluster_a, tree.steps[2].cluster_b), (5, 6));
        // mean of |{0,1} - {5,6}| = (5 + 6 + 4 + 5) / 4
        assert_relative_eq!(tree.steps[2].distance, 5.0);
        assert_eq!((tree.steps[3].cluster_a, tree.steps[3].cluster_b), (4, 7));
        // mean of 20, 19, 15, 14
        assert_relative_eq!(tree.steps[3].distance, 17.0);
        assert_eq!(tree.steps[3].size, 5);
    }

    #[test]
    fn test_single_and_complete() {
        let dm = line(&[0.0, 1.0, 5.0, 6.0, 20.0]);
        let single = hierarchical_clustering(&dm, Linkage::Single).unwrap();
        assert_relative_eq!(single.steps[2].distance, 4.0);
        assert_relative_eq!(single.steps[3].distance, 14.0);

        let complete = hierarchical_clustering(&dm, Linkage::Complete).unwrap();
        assert_relative_eq!(complete.steps[2].distance, 6.0);
        assert_relative_eq!(complete.steps[3].distance, 20.0);
    }

    #[test]
    fn test_ward() {
        // ward merge height for two singletons equals their distance
        let tree = hierarchical_clustering(&line(&[0.0, 2.0, 10.0]), Linkage::Ward).unwrap();
        assert_relative_eq!(tree.steps[0].distance, 2.0);
        // sqrt(((1+1)*100 + (1+1)*64 - 1*4) / 3) = sqrt(108)
        assert_relative_eq!(tree.steps[1].distance, 108.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_steps_and_final_size() {
        let dm = line(&[3.0, 0.5, 9.0, 4.0, 7.5, 1.0]);
        for linkage in [
            Linkage::Single,
            Linkage::Complete,
            Linkage::Average,
            Linkage::Weighted,
            Linkage::Centroid,
            Linkage::Median,
            Linkage::Ward,
        ] {
            let tree = hierarchical_clustering(&dm, linkage).unwrap();
            assert_eq!(tree.steps.len(), 5);
            assert_eq!(tree.steps.last().unwrap().size, 6);
            for step in &tree.steps {
                assert!(step.cluster_a < step.cluster_b);
            }
            let mut order = tree.leaf_order();
            order.sort();
            assert_eq!(order, (0..6).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_insufficient_samples() {
        assert!(matches!(
            hierarchical_clustering(&line(&[1.0]), Linkage::Average),
            Err(AbrgError::InsufficientSamples { required: 2, actual: 1 })
        ));
    }
}

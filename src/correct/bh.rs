//! Benjamini-Hochberg false discovery rate correction.

use serde::{Deserialize, Serialize};

/// Result of BH correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BhCorrected {
    /// Feature IDs in original order.
    pub feature_ids: Vec<String>,
    /// Original p-values.
    pub p_values: Vec<f64>,
    /// Adjusted p-values (q-values); NaN where the raw p-value is NaN.
    pub q_values: Vec<f64>,
    /// Number of finite p-values entering the correction.
    pub n_tests: usize,
}

impl BhCorrected {
    /// Get q-value for a specific feature.
    pub fn get_qvalue(&self, feature_id: &str) -> Option<f64> {
        let idx = self.feature_ids.iter().position(|f| f == feature_id)?;
        self.q_values.get(idx).copied()
    }

    /// Count significant results at a threshold.
    pub fn n_significant(&self, alpha: f64) -> usize {
        self.q_values.iter().filter(|&&q| q < alpha).count()
    }

    /// Get indices of significant results.
    pub fn significant_indices(&self, alpha: f64) -> Vec<usize> {
        self.q_values
            .iter()
            .enumerate()
            .filter(|(_, &q)| q < alpha)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Apply Benjamini-Hochberg FDR correction.
///
/// For each p-value, the adjusted p-value (q-value) is calculated as:
/// q[i] = min(p[i] * n / rank[i], q[i+1])
///
/// The correction runs over the whole family at once. NaN p-values (tests
/// that could not be computed) are left out of the family and receive a
/// NaN q-value.
///
/// # Arguments
/// * `p_values` - Raw p-values
/// * `feature_ids` - Feature identifiers (same order as p_values)
pub fn correct_bh(p_values: &[f64], feature_ids: &[String]) -> BhCorrected {
    let mut q_values = vec![f64::NAN; p_values.len()];

    // Sorted index over testable p-values; ties keep input order
    let mut indices: Vec<usize> = (0..p_values.len()).filter(|&i| !p_values[i].is_nan()).collect();
    indices.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let n = indices.len();
    if n > 0 {
        let n_f64 = n as f64;
        let mut running = f64::INFINITY;

        // Work backwards from the largest p-value
        for (i, &orig_idx) in indices.iter().enumerate().rev() {
            let rank = (i + 1) as f64;
            let adjusted = p_values[orig_idx] * n_f64 / rank;
            running = running.min(adjusted).min(1.0);
            q_values[orig_idx] = running;
        }
    }

    BhCorrected {
        feature_ids: feature_ids.to_vec(),
        p_values: p_values.to_vec(),
        q_values,
        n_tests: n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("feat_{}", i)).collect()
    }

    #[test]
    fn test_bh_basic() {
        let p_values = vec![0.01, 0.04, 0.03, 0.005];
        let corrected = correct_bh(&p_values, &ids(4));

        assert_eq!(corrected.n_tests, 4);
        assert_eq!(corrected.p_values, p_values);
    }

    #[test]
    fn test_bh_ordering() {
        // P-values in non-sorted order
        let p_values = vec![0.04, 0.01, 0.03, 0.005];
        let corrected = correct_bh(&p_values, &ids(4));

        // Smallest p-value (0.005 at index 3): q = 0.005 * 4 / 1 = 0.02
        assert_relative_eq!(corrected.q_values[3], 0.02, epsilon = 1e-10);

        // Second smallest (0.01 at index 1): q = min(0.01 * 4 / 2, q[next]) = 0.02
        assert_relative_eq!(corrected.q_values[1], 0.02, epsilon = 1e-10);
    }

    #[test]
    fn test_bh_monotonicity() {
        let p_values = vec![0.1, 0.001, 0.5, 0.02, 0.05, 0.01];
        let corrected = correct_bh(&p_values, &ids(6));

        let mut order: Vec<usize> = (0..6).collect();
        order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
        let mut prev = 0.0;
        for &i in &order {
            let q = corrected.q_values[i];
            assert!(q >= prev);
            assert!(q >= p_values[i]);
            prev = q;
        }
    }

    #[test]
    fn test_bh_bounded() {
        let p_values = vec![0.5, 0.6, 0.7, 0.8, 0.9];
        let corrected = correct_bh(&p_values, &ids(5));
        for q in &corrected.q_values {
            assert!(*q <= 1.0);
        }
    }

    #[test]
    fn test_bh_empty() {
        let corrected = correct_bh(&[], &[]);
        assert_eq!(corrected.n_tests, 0);
        assert!(corrected.q_values.is_empty());
    }

    #[test]
    fn test_bh_single() {
        let corrected = correct_bh(&[0.05], &ids(1));
        assert_eq!(corrected.n_tests, 1);
        assert_relative_eq!(corrected.q_values[0], 0.05, epsilon = 1e-10);
    }

    #[test]
    fn test_bh_nan_excluded() {
        let p_values = vec![0.01, f64::NAN, 0.04];
        let corrected = correct_bh(&p_values, &ids(3));

        assert_eq!(corrected.n_tests, 2);
        assert!(corrected.q_values[1].is_nan());
        // family of two: 0.01 * 2 / 1 = 0.02, 0.04 * 2 / 2 = 0.04
        assert_relative_eq!(corrected.q_values[0], 0.02, epsilon = 1e-10);
        assert_relative_eq!(corrected.q_values[2], 0.04, epsilon = 1e-10);
    }

    #[test]
    fn test_n_significant() {
        let p_values = vec![0.001, 0.01, 0.03, 0.1, 0.5];
        let corrected = correct_bh(&p_values, &ids(5));

        assert!(corrected.n_significant(0.01) <= corrected.n_significant(0.05));
        assert!(corrected.n_significant(0.05) <= corrected.n_significant(0.10));
        assert_eq!(corrected.significant_indices(0.04), vec![0, 1]);
        assert_relative_eq!(corrected.get_qvalue("feat_0").unwrap(), 0.005, epsilon = 1e-12);
    }

    #[test]
    fn test_bh_known_values() {
        // 5 tests, p = [0.005, 0.01, 0.02, 0.04, 0.1]
        let p_values = vec![0.005, 0.01, 0.02, 0.04, 0.1];
        let corrected = correct_bh(&p_values, &ids(5));

        // Rank 1: 0.005 * 5/1 = 0.025
        // Rank 2: 0.01 * 5/2 = 0.025
        // Rank 3: 0.02 * 5/3 = 0.0333
        // Rank 4: 0.04 * 5/4 = 0.05
        // Rank 5: 0.1 * 5/5 = 0.1
        assert_relative_eq!(corrected.q_values[0], 0.025, epsilon = 1e-10);
        assert_relative_eq!(corrected.q_values[1], 0.025, epsilon = 1e-10);
        assert_relative_eq!(corrected.q_values[2], 1.0 / 30.0, epsilon = 1e-10);
        assert_relative_eq!(corrected.q_values[3], 0.05, epsilon = 1e-10);
        assert_relative_eq!(corrected.q_values[4], 0.1, epsilon = 1e-10);
    }
}

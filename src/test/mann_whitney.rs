//! Mann-Whitney U (Wilcoxon rank-sum) test.

use super::rank::{rank_average, tie_counts};
use super::TwoSampleTest;
use statrs::distribution::{ContinuousCDF, Normal};

/// Largest group size for which the exact null distribution is used.
pub const EXACT_MAX_GROUP: usize = 8;

/// Null distribution of U for group sizes (m, n) as counts indexed by u.
///
/// c(m, n, u) = c(m−1, n, u−n) + c(m, n−1, u): the largest observation
/// belongs to either group.
fn exact_u_counts(m: usize, n: usize) -> Vec<f64> {
    // table[i][j] holds the distribution for sizes (i, j)
    let mut table: Vec<Vec<Vec<f64>>> = vec![vec![Vec::new(); n + 1]; m + 1];
    for i in 0..=m {
        for j in 0..=n {
            if i == 0 || j == 0 {
                table[i][j] = vec![1.0];
                continue;
            }
            let mut counts = vec![0.0; i * j + 1];
            for (u, &c) in table[i - 1][j].iter().enumerate() {
                counts[u + j] += c;
            }
            for (u, &c) in table[i][j - 1].iter().enumerate() {
                counts[u] += c;
            }
            table[i][j] = counts;
        }
    }
    std::mem::take(&mut table[m][n])
}

fn exact_p_value(u1: f64, m: usize, n: usize) -> f64 {
    let counts = exact_u_counts(m, n);
    let total: f64 = counts.iter().sum();
    let u = u1.max((m * n) as f64 - u1).round() as usize;
    let upper: f64 = counts.iter().skip(u).sum();
    (2.0 * upper / total).min(1.0)
}

fn normal_p_value(u1: f64, m: usize, n: usize, ties: &[usize]) -> f64 {
    let (mf, nf) = (m as f64, n as f64);
    let total = mf + nf;
    let tie_term: f64 = ties
        .iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum::<f64>()
        / (total * (total - 1.0));
    let sigma = (mf * nf / 12.0 * ((total + 1.0) - tie_term)).sqrt();
    if sigma == 0.0 {
        return 1.0;
    }

    let mu = mf * nf / 2.0;
    let u = u1.max(mf * nf - u1);
    let z = (u - mu - 0.5) / sigma;
    match Normal::new(0.0, 1.0) {
        Ok(dist) => (2.0 * dist.sf(z)).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Two-sided Mann-Whitney U test of `a` against `b`.
///
/// The statistic is U for group `a`. The exact null distribution is used
/// when both groups have at most [`EXACT_MAX_GROUP`] observations and
/// there are no ties; otherwise a normal approximation with tie and
/// continuity correction.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> TwoSampleTest {
    let (m, n) = (a.len(), b.len());
    if m == 0 || n == 0 {
        return TwoSampleTest::undefined();
    }

    let combined: Vec<f64> = a.iter().chain(b).copied().collect();
    let ranks = rank_average(&combined);
    let rank_sum_a: f64 = ranks[..m].iter().sum();
    let statistic = rank_sum_a - (m * (m + 1)) as f64 / 2.0;

    let ties = tie_counts(&combined);
    let p_value = if m <= EXACT_MAX_GROUP && n <= EXACT_MAX_GROUP && ties.is_empty() {
        exact_p_value(statistic, m, n)
    } else {
        normal_p_value(statistic, m, n, &ties)
    };

    TwoSampleTest { statistic, p_value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_counts_sum_to_binomial() {
        let counts = exact_u_counts(3, 4);
        assert_eq!(counts.len(), 13);
        assert_relative_eq!(counts.iter().sum::<f64>(), 35.0);
        // symmetric around mn/2
        for u in 0..counts.len() {
            assert_eq!(counts[u], counts[counts.len() - 1 - u]);
        }
    }

    #[test]
    fn test_exact_complete_separation() {
        let res = mann_whitney_u(&[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0, 7.0]);
        assert_eq!(res.statistic, 0.0);
        // 2 / C(7, 3)
        assert_relative_eq!(res.p_value, 2.0 / 35.0, epsilon = 1e-12);
    }

    #[test]
    fn test_exact_overlapping() {
        let res = mann_whitney_u(&[1.0, 4.0, 2.0, 8.0], &[3.0, 5.0, 6.0, 7.0, 9.0]);
        assert_eq!(res.statistic, 5.0);
        assert_relative_eq!(res.p_value, 2.0 / 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normal_approximation_with_ties() {
        let a = [1.0, 2.0, 2.0, 3.0, 5.0, 6.0, 7.0, 9.0, 10.0];
        let b = [2.0, 4.0, 4.0, 8.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0];
        let res = mann_whitney_u(&a, &b);
        assert_eq!(res.statistic, 19.0);
        assert_relative_eq!(res.p_value, 0.036920, epsilon = 1e-5);
    }

    #[test]
    fn test_small_groups_with_ties_use_normal() {
        let res = mann_whitney_u(&[1.0, 1.0, 2.0], &[1.0, 3.0, 3.0]);
        assert_eq!(res.statistic, 2.0);
        assert_relative_eq!(res.p_value, 0.345779, epsilon = 1e-5);
    }

    #[test]
    fn test_identical_groups() {
        let res = mann_whitney_u(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(res.statistic, 4.5);
        assert_relative_eq!(res.p_value, 1.0);
    }

    #[test]
    fn test_all_tied() {
        let res = mann_whitney_u(&[0.0, 0.0], &[0.0, 0.0, 0.0]);
        assert_eq!(res.statistic, 3.0);
        assert_eq!(res.p_value, 1.0);
    }
}

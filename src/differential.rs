//! Two-group differential abundance testing with FDR correction.

use crate::correct::correct_bh;
use crate::data::{AbundanceMatrix, Metadata, FEATURE_ID_HEADER};
use crate::error::{AbrgError, Result};
use crate::io;
use crate::test::{mann_whitney_u, welch_t_test, TwoSampleTest};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Per-feature two-sample test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TestMethod {
    /// Welch's unequal-variance t-test.
    #[default]
    Welch,
    /// Mann-Whitney U rank-sum test.
    MannWhitney,
}

impl TestMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Welch => "ttest",
            Self::MannWhitney => "mannwhitney",
        }
    }

    /// Run the test on two groups of observations.
    pub fn run(&self, a: &[f64], b: &[f64]) -> TwoSampleTest {
        match self {
            Self::Welch => welch_t_test(a, b),
            Self::MannWhitney => mann_whitney_u(a, b),
        }
    }
}

impl fmt::Display for TestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestMethod {
    type Err = AbrgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ttest" | "t-test" | "welch" => Ok(Self::Welch),
            "mannwhitney" | "mann-whitney" | "mannwhitneyu" | "ranksum" | "wilcoxon" => Ok(Self::MannWhitney),
            _ => Err(AbrgError::UnknownMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for TestMethod {
    type Error = AbrgError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TestMethod> for String {
    fn from(method: TestMethod) -> Self {
        method.name().to_string()
    }
}

/// A named two-group comparison on one metadata column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub name: String,
    #[serde(rename = "group_col", alias = "group_column")]
    pub group_column: String,
    pub group_a: String,
    pub group_b: String,
    #[serde(default)]
    pub method: TestMethod,
}

impl Comparison {
    pub fn new(name: &str, group_column: &str, group_a: &str, group_b: &str, method: TestMethod) -> Self {
        Self {
            name: name.to_string(),
            group_column: group_column.to_string(),
            group_a: group_a.to_string(),
            group_b: group_b.to_string(),
            method,
        }
    }
}

/// Test outcome for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferentialRow {
    pub feature_id: String,
    pub statistic: f64,
    pub p_value: f64,
    pub mean_a: f64,
    pub mean_b: f64,
    pub q_value: f64,
}

/// Full per-feature table plus the q-sorted summary view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferentialResult {
    pub comparison: Comparison,
    /// Rows in matrix feature order.
    pub table: Vec<DifferentialRow>,
    /// Same rows sorted by ascending q-value (ties keep feature order, NaN last).
    pub summary: Vec<DifferentialRow>,
}

impl DifferentialResult {
    /// Row for a feature.
    pub fn get(&self, feature_id: &str) -> Option<&DifferentialRow> {
        self.table.iter().find(|r| r.feature_id == feature_id)
    }

    /// Number of features with q below `alpha`.
    pub fn n_significant(&self, alpha: f64) -> usize {
        self.table.iter().filter(|r| r.q_value < alpha).count()
    }

    fn write_rows<P: AsRef<Path>>(&self, rows: &[DifferentialRow], path: P) -> Result<()> {
        let mut writer = io::create_writer(path)?;
        writer.write_record([
            FEATURE_ID_HEADER.to_string(),
            "stat".to_string(),
            "p_value".to_string(),
            format!("mean_{}", self.comparison.group_a),
            format!("mean_{}", self.comparison.group_b),
            "q_value".to_string(),
        ])?;
        for row in rows {
            writer.write_record([
                row.feature_id.clone(),
                io::fmt_f64(row.statistic),
                io::fmt_f64(row.p_value),
                io::fmt_f64(row.mean_a),
                io::fmt_f64(row.mean_b),
                io::fmt_f64(row.q_value),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the full table in feature order.
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_rows(&self.table, path)
    }

    /// Write the q-sorted summary.
    pub fn summary_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_rows(&self.summary, path)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample positions labelled `level` in the comparison column.
fn group_positions(labels: &[Option<String>], level: &str, column: &str) -> Result<Vec<usize>> {
    let positions: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, l)| l.as_deref() == Some(level))
        .map(|(j, _)| j)
        .collect();
    if positions.is_empty() {
        return Err(AbrgError::EmptyGroup {
            column: column.to_string(),
            level: level.to_string(),
        });
    }
    Ok(positions)
}

/// Compare two sample groups feature by feature.
///
/// Every feature is tested independently; q-values come from one
/// Benjamini-Hochberg correction over the whole family of raw p-values.
pub fn differential_abundance(
    matrix: &AbundanceMatrix,
    metadata: &Metadata,
    comparison: &Comparison,
) -> Result<DifferentialResult> {
    let labels = metadata.labels_for(&comparison.group_column, matrix.sample_ids())?;
    if metadata.n_samples() != matrix.n_samples() {
        let extra: Vec<&str> = metadata
            .sample_ids()
            .iter()
            .filter(|s| matrix.sample_position(s).is_none())
            .map(String::as_str)
            .collect();
        return Err(AbrgError::SampleMismatch(format!(
            "samples in metadata but not in the abundance matrix: {}",
            extra.join(", ")
        )));
    }

    let group_a = group_positions(&labels, &comparison.group_a, &comparison.group_column)?;
    let group_b = group_positions(&labels, &comparison.group_b, &comparison.group_column)?;
    log::debug!(
        "comparison '{}': {} vs {} samples, {} features",
        comparison.name,
        group_a.len(),
        group_b.len(),
        matrix.n_features()
    );

    let mut table: Vec<DifferentialRow> = (0..matrix.n_features())
        .into_par_iter()
        .map(|i| {
            let a: Vec<f64> = group_a.iter().map(|&j| matrix.get(i, j)).collect();
            let b: Vec<f64> = group_b.iter().map(|&j| matrix.get(i, j)).collect();
            let test = comparison.method.run(&a, &b);
            DifferentialRow {
                feature_id: matrix.feature_ids()[i].clone(),
                statistic: test.statistic,
                p_value: test.p_value,
                mean_a: mean(&a),
                mean_b: mean(&b),
                q_value: f64::NAN,
            }
        })
        .collect();

    let p_values: Vec<f64> = table.iter().map(|r| r.p_value).collect();
    let corrected = correct_bh(&p_values, matrix.feature_ids());
    for (row, q) in table.iter_mut().zip(corrected.q_values) {
        row.q_value = q;
    }

    let mut summary = table.clone();
    summary.sort_by(|a, b| match (a.q_value.is_nan(), b.q_value.is_nan()) {
        (false, false) => a.q_value.total_cmp(&b.q_value),
        (x, y) => x.cmp(&y),
    });

    Ok(DifferentialResult {
        comparison: comparison.clone(),
        table,
        summary,
    })
}

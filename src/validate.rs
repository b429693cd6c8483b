//! Input checks run before the analyses.
//!
//! The analysis functions assume their inputs are consistent; these checks
//! are what the pipeline runs on freshly loaded tables.

use crate::data::{AbundanceMatrix, Metadata};
use crate::error::{AbrgError, Result};
use std::collections::BTreeSet;

/// Ensure the matrix and the metadata describe the same set of samples.
pub fn validate_samples(matrix: &AbundanceMatrix, metadata: &Metadata) -> Result<()> {
    let in_matrix: BTreeSet<&str> = matrix.sample_ids().iter().map(String::as_str).collect();
    let in_metadata: BTreeSet<&str> = metadata.sample_ids().iter().map(String::as_str).collect();

    let missing_in_metadata: Vec<&str> = in_matrix.difference(&in_metadata).copied().collect();
    let missing_in_matrix: Vec<&str> = in_metadata.difference(&in_matrix).copied().collect();
    if missing_in_metadata.is_empty() && missing_in_matrix.is_empty() {
        return Ok(());
    }
    Err(AbrgError::SampleMismatch(format!(
        "missing in metadata: [{}]; missing in abundance table: [{}]",
        missing_in_metadata.join(", "),
        missing_in_matrix.join(", ")
    )))
}

/// Reject negative abundances.
pub fn validate_non_negative(matrix: &AbundanceMatrix, name: &str) -> Result<()> {
    let negatives = matrix.matrix().iter().filter(|&&v| v < 0.0).count();
    if negatives > 0 {
        return Err(AbrgError::Validation(format!(
            "{} negative value(s) found in {} table",
            negatives, name
        )));
    }
    Ok(())
}

/// Reject missing (NaN) or infinite abundances.
pub fn validate_finite(matrix: &AbundanceMatrix, name: &str) -> Result<()> {
    for j in 0..matrix.n_samples() {
        for i in 0..matrix.n_features() {
            if !matrix.get(i, j).is_finite() {
                return Err(AbrgError::Validation(format!(
                    "missing or non-finite value in {} table at feature '{}', sample '{}'",
                    name,
                    matrix.feature_ids()[i],
                    matrix.sample_ids()[j]
                )));
            }
        }
    }
    Ok(())
}

/// Ensure metadata has each column in `required`, with no missing values.
pub fn validate_required_columns<S: AsRef<str>>(metadata: &Metadata, required: &[S]) -> Result<()> {
    for column in required.iter().map(AsRef::as_ref) {
        if !metadata.has_column(column) {
            return Err(AbrgError::MissingColumn(column.to_string()));
        }
        let labels = metadata.labels_for(column, metadata.sample_ids())?;
        let missing: Vec<&str> = metadata
            .sample_ids()
            .iter()
            .zip(&labels)
            .filter(|(_, l)| l.is_none())
            .map(|(s, _)| s.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(AbrgError::Validation(format!(
                "missing values in metadata column '{}' for sample(s): {}",
                column,
                missing.join(", ")
            )));
        }
    }
    Ok(())
}

//! Dense feature-by-sample abundance matrix.

use crate::error::{AbrgError, Result};
use crate::io;
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Header written in the first column of abundance tables.
pub const FEATURE_ID_HEADER: &str = "KO";

/// A dense abundance matrix storing feature values across samples.
///
/// Rows represent features (KOs/genes), columns represent samples. Values
/// are raw counts or derived proportions. Identifier lookups go through
/// hash maps built once at construction, which also rejects duplicates.
#[derive(Debug, Clone)]
pub struct AbundanceMatrix {
    /// Values (features × samples).
    data: DMatrix<f64>,
    /// Feature identifiers (row names).
    feature_ids: Vec<String>,
    /// Sample identifiers (column names).
    sample_ids: Vec<String>,
    feature_index: HashMap<String, usize>,
    sample_index: HashMap<String, usize>,
}

fn build_index(ids: &[String]) -> Result<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        if index.insert(id.clone(), i).is_some() {
            return Err(AbrgError::DuplicateId(id.clone()));
        }
    }
    Ok(index)
}

impl AbundanceMatrix {
    /// Create a new AbundanceMatrix from a dense matrix and identifiers.
    pub fn new(data: DMatrix<f64>, feature_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(AbrgError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(AbrgError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        let feature_index = build_index(&feature_ids)?;
        let sample_index = build_index(&sample_ids)?;
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
            feature_index,
            sample_index,
        })
    }

    /// Build a matrix from row vectors (one per feature).
    pub fn from_rows(
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
        rows: &[Vec<f64>],
    ) -> Result<Self> {
        let n_samples = sample_ids.len();
        if rows.len() != feature_ids.len() {
            return Err(AbrgError::DimensionMismatch {
                expected: feature_ids.len(),
                actual: rows.len(),
            });
        }
        for row in rows {
            if row.len() != n_samples {
                return Err(AbrgError::DimensionMismatch {
                    expected: n_samples,
                    actual: row.len(),
                });
            }
        }
        let data = DMatrix::from_fn(rows.len(), n_samples, |i, j| rows[i][j]);
        Self::new(data, feature_ids, sample_ids)
    }

    /// Read a matrix from any delimited source.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is the feature ID header)
    /// - Subsequent rows: feature ID followed by values
    ///
    /// Missing cells (`NA`, empty) are read as NaN and left for validation.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        Self::from_csv_reader(io::reader_from(reader, delimiter))
    }

    /// Load a matrix from a CSV or TSV file (delimiter chosen by extension).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_csv_reader(io::open_reader(path)?)
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let header = reader.headers()?.clone();
        if header.len() < 2 {
            return Err(AbrgError::EmptyData(
                "Abundance table must have at least one sample column".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header.iter().skip(1).map(String::from).collect();
        let n_samples = sample_ids.len();

        let mut feature_ids = Vec::new();
        let mut values = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            if record.len() != n_samples + 1 {
                return Err(AbrgError::DimensionMismatch {
                    expected: n_samples + 1,
                    actual: record.len(),
                });
            }
            feature_ids.push(record[0].to_string());
            for (col_idx, raw) in record.iter().skip(1).enumerate() {
                values.push(io::parse_number(raw, row_idx, col_idx)?);
            }
        }

        if feature_ids.is_empty() {
            return Err(AbrgError::EmptyData("No features in abundance table".to_string()));
        }

        let data = DMatrix::from_row_slice(feature_ids.len(), n_samples, &values);
        Self::new(data, feature_ids, sample_ids)
    }

    /// Write the matrix to a CSV or TSV file (delimiter chosen by extension).
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = io::create_writer(path)?;
        let mut header = vec![FEATURE_ID_HEADER.to_string()];
        header.extend(self.sample_ids.iter().cloned());
        writer.write_record(&header)?;
        for (i, feature_id) in self.feature_ids.iter().enumerate() {
            let mut record = Vec::with_capacity(self.n_samples() + 1);
            record.push(feature_id.clone());
            record.extend((0..self.n_samples()).map(|j| io::fmt_f64(self.data[(i, j)])));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Get the value at (feature, sample).
    #[inline]
    pub fn get(&self, feature: usize, sample: usize) -> f64 {
        self.data[(feature, sample)]
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Row index of a feature.
    pub fn feature_position(&self, feature_id: &str) -> Option<usize> {
        self.feature_index.get(feature_id).copied()
    }

    /// Column index of a sample.
    pub fn sample_position(&self, sample_id: &str) -> Option<usize> {
        self.sample_index.get(sample_id).copied()
    }

    /// Get reference to the underlying matrix.
    #[inline]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Get a row (feature) as a vector.
    pub fn row(&self, feature: usize) -> Vec<f64> {
        self.data.row(feature).iter().copied().collect()
    }

    /// Get a column (sample) as a vector.
    pub fn col(&self, sample: usize) -> Vec<f64> {
        self.data.column(sample).iter().copied().collect()
    }

    /// Column sums (library sizes per sample).
    pub fn col_sums(&self) -> Vec<f64> {
        self.data.column_iter().map(|c| c.sum()).collect()
    }

    /// Mean value of each feature across samples.
    pub fn row_means(&self) -> Vec<f64> {
        let n = self.n_samples() as f64;
        (0..self.n_features())
            .into_par_iter()
            .map(|i| self.data.row(i).sum() / n)
            .collect()
    }

    /// Fraction of samples in which each feature is present (> 0).
    pub fn prevalence(&self) -> Vec<f64> {
        let n = self.n_samples() as f64;
        (0..self.n_features())
            .into_par_iter()
            .map(|i| self.data.row(i).iter().filter(|&&v| v > 0.0).count() as f64 / n)
            .collect()
    }

    /// Subset the matrix to the given feature rows, in the given order.
    pub fn subset_features(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_features()) {
            return Err(AbrgError::InvalidParameter(format!(
                "Feature index {} out of bounds",
                bad
            )));
        }
        let data = self.data.select_rows(indices);
        let feature_ids = indices.iter().map(|&i| self.feature_ids[i].clone()).collect();
        Self::new(data, feature_ids, self.sample_ids.clone())
    }

    /// Subset the matrix to the given sample columns, in the given order.
    pub fn subset_samples(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&j| j >= self.n_samples()) {
            return Err(AbrgError::InvalidParameter(format!(
                "Sample index {} out of bounds",
                bad
            )));
        }
        let data = self.data.select_columns(indices);
        let sample_ids = indices.iter().map(|&j| self.sample_ids[j].clone()).collect();
        Self::new(data, self.feature_ids.clone(), sample_ids)
    }

    /// Reorder the sample axis to follow `sample_ids`.
    pub fn align_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let indices = sample_ids
            .iter()
            .map(|sid| {
                self.sample_position(sid).ok_or_else(|| {
                    AbrgError::SampleMismatch(format!("Sample '{}' not found in abundance table", sid))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.subset_samples(&indices)
    }
}

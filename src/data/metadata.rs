//! Sample metadata keyed by sample ID.

use crate::error::{AbrgError, Result};
use crate::io;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

/// Name of the identifier column expected first in metadata files.
pub const SAMPLE_ID_COLUMN: &str = "sample_id";

/// A variable value that can be categorical, continuous, or ordinal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with string levels.
    Categorical(String),
    /// Continuous numeric variable.
    Continuous(f64),
    /// Ordinal variable with integer rank.
    Ordinal(i64),
    /// Missing value.
    Missing,
}

impl Variable {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing)
    }

    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a number (continuous or ordinal).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variable::Continuous(v) => Some(*v),
            Variable::Ordinal(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Group label for this value, `None` when missing.
    ///
    /// Numeric values are rendered the way they would be written back out,
    /// so a continuous `2.0` groups under `"2"`.
    pub fn label(&self) -> Option<String> {
        match self {
            Variable::Categorical(s) => Some(s.clone()),
            Variable::Continuous(v) => Some(format!("{}", v)),
            Variable::Ordinal(v) => Some(v.to_string()),
            Variable::Missing => None,
        }
    }
}

/// Type of a metadata column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Categorical,
    Continuous,
    Ordinal,
}

/// Sample metadata containing variables for each sample.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Sample IDs in order.
    sample_ids: Vec<String>,
    /// Column names, excluding the sample ID column.
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> Variable.
    data: HashMap<String, HashMap<String, Variable>>,
    column_types: HashMap<String, VariableType>,
}

impl Metadata {
    /// Create metadata with the given samples and no columns.
    pub fn new(sample_ids: Vec<String>) -> Result<Self> {
        let mut data = HashMap::with_capacity(sample_ids.len());
        for sid in &sample_ids {
            if data.insert(sid.clone(), HashMap::new()).is_some() {
                return Err(AbrgError::DuplicateId(sid.clone()));
            }
        }
        Ok(Self {
            sample_ids,
            column_names: Vec::new(),
            data,
            column_types: HashMap::new(),
        })
    }

    /// Add a column with one value per sample, in sample order.
    pub fn with_column(mut self, name: &str, var_type: VariableType, values: Vec<Variable>) -> Result<Self> {
        if values.len() != self.sample_ids.len() {
            return Err(AbrgError::DimensionMismatch {
                expected: self.sample_ids.len(),
                actual: values.len(),
            });
        }
        if self.has_column(name) {
            return Err(AbrgError::InvalidParameter(format!(
                "Column '{}' already present",
                name
            )));
        }
        for (sid, value) in self.sample_ids.iter().zip(values) {
            if let Some(row) = self.data.get_mut(sid) {
                row.insert(name.to_string(), value);
            }
        }
        self.column_names.push(name.to_string());
        self.column_types.insert(name.to_string(), var_type);
        Ok(self)
    }

    /// Add a categorical column from string labels.
    pub fn with_categorical(self, name: &str, labels: &[&str]) -> Result<Self> {
        let values = labels
            .iter()
            .map(|l| {
                if io::is_missing(l) {
                    Variable::Missing
                } else {
                    Variable::Categorical(l.to_string())
                }
            })
            .collect();
        self.with_column(name, VariableType::Categorical, values)
    }

    /// Add a continuous column.
    pub fn with_continuous(self, name: &str, values: &[f64]) -> Result<Self> {
        let values = values
            .iter()
            .map(|&v| if v.is_nan() { Variable::Missing } else { Variable::Continuous(v) })
            .collect();
        self.with_column(name, VariableType::Continuous, values)
    }

    /// Read metadata from any delimited source.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is the sample ID)
    /// - Subsequent rows: sample ID followed by variable values
    ///
    /// Columns are inferred as continuous if all non-missing values parse as
    /// numbers, otherwise categorical.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        Self::from_csv_reader(io::reader_from(reader, delimiter))
    }

    /// Load metadata from a CSV or TSV file (delimiter chosen by extension).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_csv_reader(io::open_reader(path)?)
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let header = reader.headers()?.clone();
        if header.is_empty() {
            return Err(AbrgError::EmptyData("Empty metadata file".to_string()));
        }
        let column_names: Vec<String> = header.iter().skip(1).map(String::from).collect();

        let mut raw_data: Vec<(String, Vec<String>)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            let values = record.iter().skip(1).map(String::from).collect();
            raw_data.push((record[0].to_string(), values));
        }

        if raw_data.is_empty() {
            return Err(AbrgError::EmptyData("No samples in metadata".to_string()));
        }

        let sample_ids = raw_data.iter().map(|(sid, _)| sid.clone()).collect();
        let mut metadata = Self::new(sample_ids)?;

        for (col_idx, col_name) in column_names.iter().enumerate() {
            let cells: Vec<&str> = raw_data
                .iter()
                .map(|(_, values)| values.get(col_idx).map(String::as_str).unwrap_or(""))
                .collect();
            let all_numeric = cells
                .iter()
                .all(|c| io::is_missing(c) || c.parse::<f64>().is_ok());
            metadata = if all_numeric {
                let values: Vec<f64> = cells
                    .iter()
                    .map(|c| c.parse::<f64>().unwrap_or(f64::NAN))
                    .collect();
                metadata.with_continuous(col_name, &values)?
            } else {
                metadata.with_categorical(col_name, &cells)?
            };
        }

        Ok(metadata)
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get a variable value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Get the type of a column.
    pub fn column_type(&self, column: &str) -> Option<VariableType> {
        self.column_types.get(column).copied()
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_types.contains_key(column)
    }

    /// Group labels of `column` for the given samples, in the given order.
    ///
    /// Fails with `MissingColumn` for an unknown column and with
    /// `SampleMismatch` when a sample is absent from the metadata.
    pub fn labels_for(&self, column: &str, sample_ids: &[String]) -> Result<Vec<Option<String>>> {
        if !self.has_column(column) {
            return Err(AbrgError::MissingColumn(column.to_string()));
        }
        sample_ids
            .iter()
            .map(|sid| {
                let row = self.data.get(sid).ok_or_else(|| {
                    AbrgError::SampleMismatch(format!("Sample '{}' not found in metadata", sid))
                })?;
                Ok(row.get(column).and_then(Variable::label))
            })
            .collect()
    }

    /// Numeric values of `column` for the given samples (`None` when missing
    /// or non-numeric).
    pub fn numeric_for(&self, column: &str, sample_ids: &[String]) -> Result<Vec<Option<f64>>> {
        if !self.has_column(column) {
            return Err(AbrgError::MissingColumn(column.to_string()));
        }
        sample_ids
            .iter()
            .map(|sid| {
                let row = self.data.get(sid).ok_or_else(|| {
                    AbrgError::SampleMismatch(format!("Sample '{}' not found in metadata", sid))
                })?;
                Ok(row.get(column).and_then(Variable::as_f64))
            })
            .collect()
    }

    /// Distinct non-missing labels of a column, sorted.
    pub fn levels(&self, column: &str) -> Result<Vec<String>> {
        let labels = self.labels_for(column, &self.sample_ids)?;
        let levels: BTreeSet<String> = labels.into_iter().flatten().collect();
        Ok(levels.into_iter().collect())
    }

    /// Subset metadata to only include specified samples.
    pub fn subset_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let mut new_data = HashMap::with_capacity(sample_ids.len());
        for sid in sample_ids {
            let row = self.data.get(sid).ok_or_else(|| {
                AbrgError::SampleMismatch(format!("Sample '{}' not found in metadata", sid))
            })?;
            new_data.insert(sid.clone(), row.clone());
        }

        Ok(Self {
            sample_ids: sample_ids.to_vec(),
            column_names: self.column_names.clone(),
            data: new_data,
            column_types: self.column_types.clone(),
        })
    }
}

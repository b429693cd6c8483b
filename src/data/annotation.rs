//! Per-feature annotation attributes (gene name, mechanism, antibiotic class).

use crate::error::{AbrgError, Result};
use crate::io;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Attribute holding the resistance mechanism of a feature.
pub const MECHANISM: &str = "mechanism";
/// Attribute holding the gene name of a feature.
pub const GENE_NAME: &str = "gene_name";
/// Attribute holding the antibiotic class of a feature.
pub const ANTIBIOTIC_CLASS: &str = "antibiotic_class";

/// A string-valued annotation table keyed by feature ID.
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    feature_ids: Vec<String>,
    attributes: Vec<String>,
    /// Row-major values, one row per feature, one cell per attribute.
    values: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl AnnotationTable {
    /// Create a table from feature IDs, attribute names and row values.
    pub fn new(feature_ids: Vec<String>, attributes: Vec<String>, values: Vec<Vec<String>>) -> Result<Self> {
        if values.len() != feature_ids.len() {
            return Err(AbrgError::DimensionMismatch {
                expected: feature_ids.len(),
                actual: values.len(),
            });
        }
        if let Some(row) = values.iter().find(|r| r.len() != attributes.len()) {
            return Err(AbrgError::DimensionMismatch {
                expected: attributes.len(),
                actual: row.len(),
            });
        }
        let mut index = HashMap::with_capacity(feature_ids.len());
        for (i, id) in feature_ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(AbrgError::DuplicateId(id.clone()));
            }
        }
        Ok(Self {
            feature_ids,
            attributes,
            values,
            index,
        })
    }

    /// Read annotations from any delimited source. The first column holds
    /// the feature ID; every other column becomes an attribute.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        Self::from_csv_reader(io::reader_from(reader, delimiter))
    }

    /// Load annotations from a CSV or TSV file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_csv_reader(io::open_reader(path)?)
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let header = reader.headers()?.clone();
        if header.is_empty() {
            return Err(AbrgError::EmptyData("Empty annotation file".to_string()));
        }
        let attributes: Vec<String> = header.iter().skip(1).map(String::from).collect();
        let mut feature_ids = Vec::new();
        let mut values = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            feature_ids.push(record[0].to_string());
            let row = (0..attributes.len())
                .map(|k| record.get(k + 1).unwrap_or("").to_string())
                .collect();
            values.push(row);
        }
        Self::new(feature_ids, attributes, values)
    }

    /// Feature IDs in file order.
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Attribute names in file order.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Number of annotated features.
    pub fn len(&self) -> usize {
        self.feature_ids.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.feature_ids.is_empty()
    }

    /// Check whether an attribute column exists.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }

    /// Check whether a feature is annotated.
    pub fn contains(&self, feature_id: &str) -> bool {
        self.index.contains_key(feature_id)
    }

    /// Attribute value for a feature; `None` if the feature or attribute is
    /// unknown.
    pub fn get(&self, feature_id: &str, attribute: &str) -> Option<&str> {
        let row = *self.index.get(feature_id)?;
        let col = self.attributes.iter().position(|a| a == attribute)?;
        Some(self.values[row][col].as_str())
    }

    /// All attribute values of a feature, in attribute order.
    pub fn row(&self, feature_id: &str) -> Option<&[String]> {
        self.index.get(feature_id).map(|&i| self.values[i].as_slice())
    }
}

//! Taxon-stratified feature table (feature × taxon × sample).

use crate::data::AbundanceMatrix;
use crate::error::{AbrgError, Result};
use crate::io;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Column holding the feature ID in stratified tables.
pub const FEATURE_COLUMN: &str = "KO";
/// Column holding the contributing taxon in stratified tables.
pub const TAXON_COLUMN: &str = "Taxon";

/// One row of a stratified table: a feature attributed to a taxon.
#[derive(Debug, Clone, PartialEq)]
pub struct StratifiedRow {
    pub feature_id: String,
    pub taxon: String,
    /// One value per sample, in the table's sample order.
    pub values: Vec<f64>,
}

/// Total abundance contributed by one taxon to one feature across samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonContribution {
    pub feature_id: String,
    pub taxon: String,
    pub abundance: f64,
}

/// A feature table split by contributing taxon.
#[derive(Debug, Clone)]
pub struct StratifiedTable {
    sample_ids: Vec<String>,
    rows: Vec<StratifiedRow>,
}

impl StratifiedTable {
    /// Create a table from sample IDs and rows.
    pub fn new(sample_ids: Vec<String>, rows: Vec<StratifiedRow>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.values.len() != sample_ids.len()) {
            return Err(AbrgError::DimensionMismatch {
                expected: sample_ids.len(),
                actual: row.values.len(),
            });
        }
        Ok(Self { sample_ids, rows })
    }

    /// Read a stratified table from any delimited source. The `KO` and
    /// `Taxon` columns may appear anywhere; every other column is a sample.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        Self::from_csv_reader(io::reader_from(reader, delimiter))
    }

    /// Load a stratified table from a CSV or TSV file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_csv_reader(io::open_reader(path)?)
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let header = reader.headers()?.clone();
        let feature_col = header
            .iter()
            .position(|h| h == FEATURE_COLUMN)
            .ok_or_else(|| AbrgError::MissingColumn(FEATURE_COLUMN.to_string()))?;
        let taxon_col = header
            .iter()
            .position(|h| h == TAXON_COLUMN)
            .ok_or_else(|| AbrgError::MissingColumn(TAXON_COLUMN.to_string()))?;
        let sample_cols: Vec<usize> = (0..header.len())
            .filter(|&c| c != feature_col && c != taxon_col)
            .collect();
        let sample_ids = sample_cols.iter().map(|&c| header[c].to_string()).collect();

        let mut rows = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            let values = sample_cols
                .iter()
                .map(|&c| io::parse_number(record.get(c).unwrap_or(""), row_idx, c))
                .collect::<Result<Vec<_>>>()?;
            rows.push(StratifiedRow {
                feature_id: record.get(feature_col).unwrap_or("").to_string(),
                taxon: record.get(taxon_col).unwrap_or("").to_string(),
                values,
            });
        }
        Self::new(sample_ids, rows)
    }

    /// Sample IDs in table order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Table rows.
    pub fn rows(&self) -> &[StratifiedRow] {
        &self.rows
    }

    /// Collapse to a feature × sample matrix by summing over taxa.
    ///
    /// Features come out sorted by ID.
    pub fn to_abundance(&self) -> Result<AbundanceMatrix> {
        if self.rows.is_empty() {
            return Err(AbrgError::EmptyData("Stratified table has no rows".to_string()));
        }
        let n_samples = self.sample_ids.len();
        let mut totals: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for row in &self.rows {
            let entry = totals
                .entry(row.feature_id.as_str())
                .or_insert_with(|| vec![0.0; n_samples]);
            for (acc, v) in entry.iter_mut().zip(&row.values) {
                *acc += v;
            }
        }
        let feature_ids: Vec<String> = totals.keys().map(|k| k.to_string()).collect();
        let data = DMatrix::from_fn(feature_ids.len(), n_samples, |i, j| {
            totals[feature_ids[i].as_str()][j]
        });
        AbundanceMatrix::new(data, feature_ids, self.sample_ids.clone())
    }

    /// Total abundance per (feature, taxon) across all samples, sorted by
    /// feature then taxon.
    pub fn taxon_contributions(&self) -> Vec<TaxonContribution> {
        let mut totals: BTreeMap<(&str, &str), f64> = BTreeMap::new();
        for row in &self.rows {
            *totals
                .entry((row.feature_id.as_str(), row.taxon.as_str()))
                .or_insert(0.0) += row.values.iter().sum::<f64>();
        }
        totals
            .into_iter()
            .map(|((feature_id, taxon), abundance)| TaxonContribution {
                feature_id: feature_id.to_string(),
                taxon: taxon.to_string(),
                abundance,
            })
            .collect()
    }
}

/// Write `KO,Taxon,abundance` rows.
pub fn write_taxon_contributions<P: AsRef<Path>>(contributions: &[TaxonContribution], path: P) -> Result<()> {
    let mut writer = io::create_writer(path)?;
    writer.write_record([FEATURE_COLUMN, TAXON_COLUMN, "abundance"])?;
    for c in contributions {
        writer.write_record([
            c.feature_id.as_str(),
            c.taxon.as_str(),
            io::fmt_f64(c.abundance).as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TABLE: &str = "KO\tTaxon\tS1\tS2\n\
                         K2\tEcoli\t1\t2\n\
                         K1\tEcoli\t3\t0\n\
                         K2\tKpneumo\t4\t5\n\
                         K2\tEcoli\t1\t1\n";

    #[test]
    fn test_read_stratified() {
        let table = StratifiedTable::from_reader(TABLE.as_bytes(), b'\t').unwrap();
        assert_eq!(table.sample_ids(), &["S1", "S2"]);
        assert_eq!(table.rows().len(), 4);
        assert_eq!(table.rows()[2].taxon, "Kpneumo");
    }

    #[test]
    fn test_to_abundance_sums_taxa() {
        let table = StratifiedTable::from_reader(TABLE.as_bytes(), b'\t').unwrap();
        let mat = table.to_abundance().unwrap();
        assert_eq!(mat.feature_ids(), &["K1", "K2"]);
        assert_relative_eq!(mat.get(0, 0), 3.0);
        assert_relative_eq!(mat.get(1, 0), 6.0);
        assert_relative_eq!(mat.get(1, 1), 8.0);
    }

    #[test]
    fn test_taxon_contributions() {
        let table = StratifiedTable::from_reader(TABLE.as_bytes(), b'\t').unwrap();
        let contrib = table.taxon_contributions();
        assert_eq!(contrib.len(), 3);
        assert_eq!(contrib[0].feature_id, "K1");
        assert_eq!(contrib[1].taxon, "Ecoli");
        assert_relative_eq!(contrib[1].abundance, 5.0);
        assert_relative_eq!(contrib[2].abundance, 9.0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxon_contributions.csv");
        write_taxon_contributions(&contrib, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("KO,Taxon,abundance\nK1,Ecoli,3"));
    }

    #[test]
    fn test_missing_taxon_column() {
        let data = "KO,S1\nK1,2\n";
        let result = StratifiedTable::from_reader(data.as_bytes(), b',');
        assert!(matches!(result, Err(AbrgError::MissingColumn(c)) if c == TAXON_COLUMN));
    }
}

//! Top-N feature selection by mean abundance and prevalence.

use crate::data::annotation::{ANTIBIOTIC_CLASS, GENE_NAME, MECHANISM};
use crate::data::{AbundanceMatrix, AnnotationTable, FEATURE_ID_HEADER};
use crate::error::{AbrgError, Result};
use crate::io;
use crate::profile::{order_by_mean_desc, profile_prevalence};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Keep only features whose `attribute` takes one of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    #[serde(default = "default_filter_attribute")]
    pub attribute: String,
    #[serde(default)]
    pub values: Vec<String>,
}

fn default_filter_attribute() -> String {
    MECHANISM.to_string()
}

impl AttributeFilter {
    /// Filter on the `mechanism` annotation.
    pub fn mechanism<S: AsRef<str>>(values: &[S]) -> Self {
        Self {
            attribute: MECHANISM.to_string(),
            values: values.iter().map(|v| v.as_ref().to_string()).collect(),
        }
    }

    /// An empty value set selects everything.
    pub fn is_active(&self) -> bool {
        !self.values.is_empty()
    }

    fn accepts(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.values.iter().any(|allowed| allowed == v))
    }
}

/// Parameters of one selection scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub top_n: usize,
    /// Inclusive lower bound on the fraction of samples with abundance > 0.
    pub min_prevalence: f64,
    #[serde(default)]
    pub attribute_filter: Option<AttributeFilter>,
    /// Select from the taxon-collapsed stratified table instead of the
    /// unstratified one.
    #[serde(default)]
    pub use_stratified: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            top_n: 30,
            min_prevalence: 0.1,
            attribute_filter: None,
            use_stratified: false,
        }
    }
}

/// One selected feature with its annotation values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedFeature {
    pub feature_id: String,
    pub mean_abundance: f64,
    pub prevalence: f64,
    /// Annotation values aligned with [`FeatureSelection::attributes`].
    pub annotations: Vec<String>,
}

/// Ranked top-N features merged with annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelection {
    /// Annotation attribute names.
    pub attributes: Vec<String>,
    /// Selected rows, highest mean abundance first.
    pub rows: Vec<SelectedFeature>,
    /// Matrix features without an annotation entry (dropped by the join).
    pub n_unannotated: usize,
}

impl FeatureSelection {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn feature_ids(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.feature_id.as_str()).collect()
    }

    /// Annotation value of a selected row.
    pub fn annotation<'a>(&self, row: &'a SelectedFeature, attribute: &str) -> Option<&'a str> {
        let idx = self.attributes.iter().position(|a| a == attribute)?;
        row.annotations.get(idx).map(String::as_str)
    }

    /// Write `KO,<attributes...>,mean_abundance,prevalence` rows.
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = io::create_writer(path)?;
        let mut header = vec![FEATURE_ID_HEADER.to_string()];
        header.extend(self.attributes.iter().cloned());
        header.push("mean_abundance".to_string());
        header.push("prevalence".to_string());
        writer.write_record(&header)?;
        for row in &self.rows {
            let mut record = vec![row.feature_id.clone()];
            record.extend(row.annotations.iter().cloned());
            record.push(io::fmt_f64(row.mean_abundance));
            record.push(io::fmt_f64(row.prevalence));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Rank annotated features by mean abundance.
///
/// Features are inner-joined with `annotations`, filtered by prevalence
/// (inclusive) and by the optional attribute filter, sorted by mean
/// abundance descending with ties broken by feature ID, then truncated to
/// `top_n`.
pub fn select_top_features(
    matrix: &AbundanceMatrix,
    annotations: &AnnotationTable,
    config: &SelectionConfig,
) -> Result<FeatureSelection> {
    let filter = config.attribute_filter.as_ref().filter(|f| f.is_active());
    if let Some(f) = filter {
        if !annotations.has_attribute(&f.attribute) {
            return Err(AbrgError::UnknownAttribute(f.attribute.clone()));
        }
    }

    let means = matrix.row_means();
    let prevalence = profile_prevalence(matrix).feature_prevalence;
    let ids = matrix.feature_ids();

    let annotated: Vec<usize> = (0..ids.len()).filter(|&i| annotations.contains(&ids[i])).collect();
    let n_unannotated = ids.len() - annotated.len();

    let candidates: Vec<usize> = annotated
        .into_iter()
        .filter(|&i| prevalence[i] >= config.min_prevalence)
        .filter(|&i| filter.map_or(true, |f| f.accepts(annotations.get(&ids[i], &f.attribute))))
        .collect();

    let mut order = order_by_mean_desc(&means, ids, candidates);
    order.truncate(config.top_n);

    let rows = order
        .into_iter()
        .map(|i| SelectedFeature {
            feature_id: ids[i].clone(),
            mean_abundance: means[i],
            prevalence: prevalence[i],
            annotations: annotations.row(&ids[i]).map(<[String]>::to_vec).unwrap_or_default(),
        })
        .collect();

    Ok(FeatureSelection {
        attributes: annotations.attributes().to_vec(),
        rows,
        n_unannotated,
    })
}

/// Summary row of the major-feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table1Row {
    pub rank: usize,
    pub feature_id: String,
    pub gene_name: String,
    pub mechanism: String,
    pub antibiotic_class: String,
    pub mean_abundance: f64,
    pub prevalence: f64,
}

/// Tabulate a selection with its gene name, mechanism and antibiotic class
/// (empty when not annotated).
pub fn build_table1(selection: &FeatureSelection) -> Vec<Table1Row> {
    selection
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let attr = |name: &str| selection.annotation(row, name).unwrap_or_default().to_string();
            Table1Row {
                rank: i + 1,
                feature_id: row.feature_id.clone(),
                gene_name: attr(GENE_NAME),
                mechanism: attr(MECHANISM),
                antibiotic_class: attr(ANTIBIOTIC_CLASS),
                mean_abundance: row.mean_abundance,
                prevalence: row.prevalence,
            }
        })
        .collect()
}

/// Write Table 1 rows.
pub fn write_table1<P: AsRef<Path>>(rows: &[Table1Row], path: P) -> Result<()> {
    let mut writer = io::create_writer(path)?;
    writer.write_record([
        "rank",
        FEATURE_ID_HEADER,
        GENE_NAME,
        MECHANISM,
        ANTIBIOTIC_CLASS,
        "mean_abundance",
        "prevalence",
    ])?;
    for row in rows {
        writer.write_record([
            row.rank.to_string(),
            row.feature_id.clone(),
            row.gene_name.clone(),
            row.mechanism.clone(),
            row.antibiotic_class.clone(),
            io::fmt_f64(row.mean_abundance),
            io::fmt_f64(row.prevalence),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> AbundanceMatrix {
        AbundanceMatrix::from_rows(
            vec!["K1".into(), "K2".into(), "K3".into(), "K4".into(), "K5".into()],
            vec!["S1".into(), "S2".into(), "S3".into(), "S4".into()],
            &[
                vec![10.0, 12.0, 8.0, 10.0],
                vec![1.0, 0.0, 0.0, 0.0],
                vec![5.0, 5.0, 5.0, 5.0],
                vec![20.0, 20.0, 0.0, 0.0],
                vec![5.0, 5.0, 5.0, 5.0],
            ],
        )
        .unwrap()
    }

    fn annotations() -> AnnotationTable {
        AnnotationTable::new(
            vec!["K1".into(), "K2".into(), "K3".into(), "K5".into()],
            vec![GENE_NAME.into(), MECHANISM.into(), ANTIBIOTIC_CLASS.into()],
            vec![
                vec!["acrB".into(), "Efflux".into(), "multidrug".into()],
                vec!["blaTEM".into(), "Inactivation".into(), "beta-lactam".into()],
                vec!["tetM".into(), "Target protection".into(), "tetracycline".into()],
                vec!["mexB".into(), "Efflux".into(), "multidrug".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_inner_join_and_ranking() {
        let config = SelectionConfig { top_n: 10, min_prevalence: 0.5, ..Default::default() };
        let sel = select_top_features(&matrix(), &annotations(), &config).unwrap();
        // K4 unannotated, K2 below prevalence, K3/K5 tie broken by ID
        assert_eq!(sel.feature_ids(), vec!["K1", "K3", "K5"]);
        assert_eq!(sel.n_unannotated, 1);
        assert_eq!(sel.rows[0].mean_abundance, 10.0);
        assert!(sel.rows.iter().all(|r| r.prevalence >= 0.5));
    }

    #[test]
    fn test_prevalence_inclusive_and_truncation() {
        let config = SelectionConfig { top_n: 1, min_prevalence: 0.25, ..Default::default() };
        let sel = select_top_features(&matrix(), &annotations(), &config).unwrap();
        assert_eq!(sel.len(), 1);
        assert_eq!(sel.feature_ids(), vec!["K1"]);

        let config = SelectionConfig { top_n: 10, min_prevalence: 0.25, ..Default::default() };
        let sel = select_top_features(&matrix(), &annotations(), &config).unwrap();
        assert!(sel.feature_ids().contains(&"K2"));
    }

    #[test]
    fn test_attribute_filter() {
        let config = SelectionConfig {
            top_n: 10,
            min_prevalence: 0.0,
            attribute_filter: Some(AttributeFilter::mechanism(&["Efflux"])),
            use_stratified: false,
        };
        let sel = select_top_features(&matrix(), &annotations(), &config).unwrap();
        assert_eq!(sel.feature_ids(), vec!["K1", "K5"]);

        // empty value set means no filter
        let config = SelectionConfig {
            attribute_filter: Some(AttributeFilter::mechanism::<&str>(&[])),
            ..config
        };
        let sel = select_top_features(&matrix(), &annotations(), &config).unwrap();
        assert_eq!(sel.len(), 4);
    }

    #[test]
    fn test_unknown_attribute() {
        let config = SelectionConfig {
            attribute_filter: Some(AttributeFilter {
                attribute: "pathway".into(),
                values: vec!["x".into()],
            }),
            ..Default::default()
        };
        assert!(matches!(
            select_top_features(&matrix(), &annotations(), &config),
            Err(AbrgError::UnknownAttribute(a)) if a == "pathway"
        ));
    }

    #[test]
    fn test_build_table1() {
        let config = SelectionConfig { top_n: 2, min_prevalence: 0.5, ..Default::default() };
        let sel = select_top_features(&matrix(), &annotations(), &config).unwrap();
        let table = build_table1(&sel);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].rank, 1);
        assert_eq!(table[0].gene_name, "acrB");
        assert_eq!(table[1].mechanism, "Target protection");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Table1.csv");
        write_table1(&table, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("rank,KO,gene_name,mechanism,antibiotic_class,mean_abundance,prevalence\n1,K1,acrB,"));
    }

    #[test]
    fn test_selection_yaml_defaults() {
        let cfg: SelectionConfig =
            serde_yaml::from_str("top_n: 5\nmin_prevalence: 0.2\nattribute_filter:\n  values: [Efflux]\n").unwrap();
        assert_eq!(cfg.attribute_filter.unwrap().attribute, "mechanism");
        assert!(!cfg.use_stratified);
    }
}

//! YAML configuration of a full resistome run.

use crate::cluster::Linkage;
use crate::differential::{Comparison, TestMethod};
use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::select::{AttributeFilter, SelectionConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Input tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Unstratified feature × sample table.
    pub ko_table: PathBuf,
    /// Optional feature × taxon × sample table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ko_stratified: Option<PathBuf>,
    pub metadata: PathBuf,
    pub ko_annotations: PathBuf,
}

/// Output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub processed_dir: PathBuf,
    pub tables_dir: PathBuf,
    pub networks_dir: PathBuf,
    /// JSON run manifest.
    pub manifest: PathBuf,
}

/// Analysis parameters. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Features kept in the top-features-over-time table.
    pub top_n: usize,
    /// Features kept per selection scenario.
    pub top30_n: usize,
    /// Default minimum prevalence for scenarios.
    pub prevalence_threshold: f64,
    /// Minimum |ρ| for a network edge.
    pub correlation_r: f64,
    /// Maximum p-value for a network edge.
    pub p_value: f64,
    /// Test used by the default comparison.
    pub diff_method: TestMethod,
    pub random_seed: u64,
    /// PERMANOVA permutations.
    pub permutations: usize,
    pub pcoa_metric: DistanceMetric,
    pub clustering_method: Linkage,
    /// Grouping column for PERMANOVA and the default comparison.
    pub group_column: String,
    /// Axes written for PCA and PCoA.
    pub ordination_axes: usize,
    pub time_series_top_n: usize,
    /// Metadata columns that must exist with no missing values.
    pub required_metadata_columns: Vec<String>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            top_n: 10,
            top30_n: 30,
            prevalence_threshold: 0.1,
            correlation_r: 0.6,
            p_value: 0.05,
            diff_method: TestMethod::Welch,
            random_seed: 42,
            permutations: 999,
            pcoa_metric: DistanceMetric::BrayCurtis,
            clustering_method: Linkage::Average,
            group_column: "period".to_string(),
            ordination_axes: 2,
            time_series_top_n: 10,
            required_metadata_columns: Vec::new(),
        }
    }
}

/// One top-feature selection scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Accepted mechanism values; empty means no filter.
    pub mechanism: Vec<String>,
    /// Overrides `parameters.prevalence_threshold`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_prevalence: Option<f64>,
    pub use_stratified: bool,
}

impl ScenarioConfig {
    /// Selector settings for this scenario under the run parameters.
    pub fn selection(&self, parameters: &Parameters) -> SelectionConfig {
        SelectionConfig {
            top_n: parameters.top30_n,
            min_prevalence: self.min_prevalence.unwrap_or(parameters.prevalence_threshold),
            attribute_filter: (!self.mechanism.is_empty()).then(|| AttributeFilter::mechanism(&self.mechanism)),
            use_stratified: self.use_stratified,
        }
    }
}

/// Complete run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub parameters: Parameters,
    /// Differential comparisons; a default one is derived when empty.
    #[serde(default)]
    pub comparisons: Vec<Comparison>,
    #[serde(default)]
    pub scenarios: BTreeMap<String, ScenarioConfig>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load from a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// A ready-to-edit configuration with the usual directory layout.
    pub fn example() -> Self {
        let mut scenarios = BTreeMap::new();
        scenarios.insert("mixed".to_string(), ScenarioConfig::default());
        scenarios.insert(
            "efflux_only".to_string(),
            ScenarioConfig {
                mechanism: vec!["Efflux".to_string()],
                ..Default::default()
            },
        );
        scenarios.insert(
            "otu_sum".to_string(),
            ScenarioConfig {
                use_stratified: true,
                ..Default::default()
            },
        );

        Self {
            project_name: Some("WWTP-ABRG-Resistome".to_string()),
            input: InputConfig {
                ko_table: "data/raw/ko_abundance.csv".into(),
                ko_stratified: Some("data/raw/ko_stratified.csv".into()),
                metadata: "metadata/sample_metadata.csv".into(),
                ko_annotations: "metadata/ko_annotations.csv".into(),
            },
            output: OutputConfig {
                processed_dir: "results/processed".into(),
                tables_dir: "results/tables".into(),
                networks_dir: "results/networks".into(),
                manifest: "results/run_manifest.json".into(),
            },
            parameters: Parameters::default(),
            comparisons: vec![Comparison::new(
                "early_vs_late",
                "period",
                "early",
                "late",
                TestMethod::Welch,
            )],
            scenarios,
        }
    }
}

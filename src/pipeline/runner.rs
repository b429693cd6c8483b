//! Runs every analysis of a resistome study and writes its tables.

use super::config::{InputConfig, OutputConfig, Parameters, PipelineConfig};
use crate::cluster::hierarchical_clustering;
use crate::data::{write_taxon_contributions, AbundanceMatrix, AnnotationTable, Metadata, StratifiedTable};
use crate::differential::{differential_abundance, Comparison};
use crate::distance::{beta_diversity, bray_curtis, DissimilarityMatrix};
use crate::error::{AbrgError, Result};
use crate::network::spearman_network;
use crate::normalize::relative_abundance;
use crate::ordination::{pca, pcoa};
use crate::profile::{profile_prevalence, richness, time_series, top_features_over_time, write_time_series};
use crate::select::{build_table1, select_top_features, write_table1, FeatureSelection, SelectionConfig};
use crate::test::{permanova, PermanovaConfig};
use crate::validate;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Metadata column read for the time-series table.
pub const DAY_COLUMN: &str = "day";

/// Scenario whose selection feeds Table 1.
pub const TABLE1_SCENARIO: &str = "mixed";

/// q-value cutoff counted in the differential abundance progress log.
pub const Q_VALUE_ALPHA: f64 = 0.05;

/// Analysis stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    RelativeAbundance,
    Richness,
    TopFeatures,
    Differential,
    Pca,
    Pcoa,
    BrayCurtis,
    Permanova,
    Clustering,
    Network,
    TaxonAttribution,
    Scenarios,
    Table1,
    TimeSeries,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 14] = [
        Self::RelativeAbundance,
        Self::Richness,
        Self::TopFeatures,
        Self::Differential,
        Self::Pca,
        Self::Pcoa,
        Self::BrayCurtis,
        Self::Permanova,
        Self::Clustering,
        Self::Network,
        Self::TaxonAttribution,
        Self::Scenarios,
        Self::Table1,
        Self::TimeSeries,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::RelativeAbundance => "relative abundance",
            Self::Richness => "richness",
            Self::TopFeatures => "top features over time",
            Self::Differential => "differential abundance",
            Self::Pca => "PCA",
            Self::Pcoa => "PCoA",
            Self::BrayCurtis => "Bray-Curtis distance",
            Self::Permanova => "PERMANOVA",
            Self::Clustering => "hierarchical clustering",
            Self::Network => "co-occurrence network",
            Self::TaxonAttribution => "taxon attribution",
            Self::Scenarios => "top-feature scenarios",
            Self::Table1 => "Table 1",
            Self::TimeSeries => "top-feature time series",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Files written, in order.
    pub written: Vec<PathBuf>,
    /// Analyses that were skipped, with the reason.
    pub skipped: Vec<String>,
}

impl PipelineReport {
    pub fn was_written<P: AsRef<Path>>(&self, path: P) -> bool {
        self.written.iter().any(|p| p == path.as_ref())
    }
}

/// Contents of the JSON run manifest.
#[derive(Debug, Serialize)]
struct RunManifest<'a> {
    timestamp: String,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_name: Option<&'a str>,
    parameters: &'a Parameters,
    inputs: &'a InputConfig,
    outputs: &'a OutputConfig,
    written: &'a [PathBuf],
    skipped: &'a [String],
}

/// Errors that make one analysis inapplicable to the data without
/// invalidating the rest of the run.
fn is_recoverable(err: &AbrgError) -> bool {
    matches!(
        err,
        AbrgError::MissingColumn(_)
            | AbrgError::EmptyGroup { .. }
            | AbrgError::SingleGroup { .. }
            | AbrgError::InsufficientSamples { .. }
            | AbrgError::DegenerateInput(_)
    )
}

/// Loaded inputs and intermediate results shared between stages.
struct PipelineState<'a> {
    config: &'a PipelineConfig,
    abundance: AbundanceMatrix,
    relative: AbundanceMatrix,
    metadata: Metadata,
    annotations: AnnotationTable,
    stratified: Option<StratifiedTable>,
    bray_curtis: Option<DissimilarityMatrix>,
    selections: BTreeMap<String, FeatureSelection>,
    report: PipelineReport,
}

impl<'a> PipelineState<'a> {
    fn load(config: &'a PipelineConfig) -> Result<Self> {
        log::info!("Loading inputs");
        let abundance = AbundanceMatrix::from_path(&config.input.ko_table)?;
        let metadata = Metadata::from_path(&config.input.metadata)?;
        let annotations = AnnotationTable::from_path(&config.input.ko_annotations)?;
        let stratified = config
            .input
            .ko_stratified
            .as_ref()
            .map(StratifiedTable::from_path)
            .transpose()?;
        log::info!(
            "Loaded {} features x {} samples, {} annotated features",
            abundance.n_features(),
            abundance.n_samples(),
            annotations.len()
        );
        log::info!("Prevalence: {}", profile_prevalence(&abundance));

        validate::validate_samples(&abundance, &metadata)?;
        validate::validate_non_negative(&abundance, "KO")?;
        validate::validate_finite(&abundance, "KO")?;
        validate::validate_required_columns(&metadata, &config.parameters.required_metadata_columns)?;

        let relative = relative_abundance(&abundance)?;

        Ok(Self {
            config,
            abundance,
            relative,
            metadata,
            annotations,
            stratified,
            bray_curtis: None,
            selections: BTreeMap::new(),
            report: PipelineReport::default(),
        })
    }

    fn tables(&self, file: &str) -> PathBuf {
        self.config.output.tables_dir.join(file)
    }

    fn record(&mut self, path: PathBuf) {
        log::debug!("Wrote {}", path.display());
        self.report.written.push(path);
    }

    fn skip(&mut self, what: impl fmt::Display, reason: impl fmt::Display) {
        log::warn!("Skipping {}: {}", what, reason);
        self.report.skipped.push(format!("{}: {}", what, reason));
    }

    fn execute(&mut self, stage: PipelineStage) -> Result<()> {
        log::info!("Running {}", stage);
        let outcome = match stage {
            PipelineStage::RelativeAbundance => self.write_abundances(),
            PipelineStage::Richness => self.richness(),
            PipelineStage::TopFeatures => self.top_features(),
            PipelineStage::Differential => self.differential(),
            PipelineStage::Pca => self.pca(),
            PipelineStage::Pcoa => self.pcoa(),
            PipelineStage::BrayCurtis => self.bray_curtis_distances(),
            PipelineStage::Permanova => self.permanova(),
            PipelineStage::Clustering => self.clustering(),
            PipelineStage::Network => self.network(),
            PipelineStage::TaxonAttribution => self.taxon_attribution(),
            PipelineStage::Scenarios => self.scenarios(),
            PipelineStage::Table1 => self.table1(),
            PipelineStage::TimeSeries => self.time_series(),
        };
        match outcome {
            Err(e) if is_recoverable(&e) => {
                self.skip(stage, e);
                Ok(())
            }
            other => other,
        }
    }

    fn write_abundances(&mut self) -> Result<()> {
        let processed = &self.config.output.processed_dir;
        let relative_path = processed.join("ko_relative_abundance.csv");
        let raw_path = processed.join("ko_raw_abundance.csv");
        self.relative.to_path(&relative_path)?;
        self.abundance.to_path(&raw_path)?;
        self.record(relative_path);
        self.record(raw_path);
        Ok(())
    }

    fn richness(&mut self) -> Result<()> {
        let path = self.tables("ko_richness.csv");
        richness(&self.abundance).to_path(&path)?;
        self.record(path);
        Ok(())
    }

    fn top_features(&mut self) -> Result<()> {
        let path = self.tables("top_kos_over_time.csv");
        top_features_over_time(&self.abundance, self.config.parameters.top_n)?.to_path(&path)?;
        self.record(path);
        Ok(())
    }

    fn comparisons(&self) -> Vec<Comparison> {
        if !self.config.comparisons.is_empty() {
            return self.config.comparisons.clone();
        }
        let params = &self.config.parameters;
        if self.metadata.has_column(&params.group_column) {
            vec![Comparison::new(
                "early_vs_late",
                &params.group_column,
                "early",
                "late",
                params.diff_method,
            )]
        } else {
            Vec::new()
        }
    }

    fn differential(&mut self) -> Result<()> {
        let comparisons = self.comparisons();
        if comparisons.is_empty() {
            self.skip(
                PipelineStage::Differential,
                format!(
                    "no comparisons configured and column '{}' is missing",
                    self.config.parameters.group_column
                ),
            );
            return Ok(());
        }

        for comparison in &comparisons {
            let what = format!("comparison '{}'", comparison.name);
            if !self.metadata.has_column(&comparison.group_column) {
                self.skip(what, format!("missing column '{}'", comparison.group_column));
                continue;
            }
            let result = match differential_abundance(&self.abundance, &self.metadata, comparison) {
                Ok(result) => result,
                Err(e) if is_recoverable(&e) => {
                    self.skip(what, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            log::info!(
                "{}: {} of {} features with q < {}",
                what,
                result.n_significant(Q_VALUE_ALPHA),
                result.table.len(),
                Q_VALUE_ALPHA
            );

            let table_path = self.tables(&format!("differential_abundance_{}.csv", comparison.name));
            let summary_path = self.tables(&format!("differential_abundance_{}_summary.csv", comparison.name));
            result.to_path(&table_path)?;
            result.summary_to_path(&summary_path)?;
            self.record(table_path);
            self.record(summary_path);
        }
        Ok(())
    }

    fn pca(&mut self) -> Result<()> {
        let result = pca(&self.relative, self.config.parameters.ordination_axes)?;
        let path = self.tables("pca_coordinates.csv");
        result.to_path(&path)?;
        self.record(path);
        Ok(())
    }

    fn pcoa(&mut self) -> Result<()> {
        let distance = beta_diversity(&self.relative, self.config.parameters.pcoa_metric)?;
        let result = pcoa(&distance, self.config.parameters.ordination_axes)?;
        let coords = self.tables("pcoa_coordinates.csv");
        let variance = self.tables("pcoa_variance.csv");
        result.to_path(&coords)?;
        result.write_variance(&variance)?;
        self.record(coords);
        self.record(variance);
        Ok(())
    }

    fn bray_curtis_distances(&mut self) -> Result<()> {
        let distance = bray_curtis(&self.relative)?;
        let path = self.tables("bray_curtis_distance.csv");
        distance.to_path(&path)?;
        self.record(path);
        self.bray_curtis = Some(distance);
        Ok(())
    }

    fn require_distance(&self) -> Result<&DissimilarityMatrix> {
        self.bray_curtis
            .as_ref()
            .ok_or_else(|| AbrgError::DegenerateInput("Bray-Curtis distances are unavailable".to_string()))
    }

    fn permanova(&mut self) -> Result<()> {
        let params = &self.config.parameters;
        let config = PermanovaConfig {
            permutations: params.permutations,
            seed: params.random_seed,
        };
        let result = permanova(self.require_distance()?, &self.metadata, &params.group_column, &config)?;
        log::info!(
            "PERMANOVA on '{}': pseudo-F = {:.4}, p = {:.4}",
            params.group_column,
            result.statistic,
            result.p_value
        );
        let path = self.tables("permanova.csv");
        result.to_path(&path)?;
        self.record(path);
        Ok(())
    }

    fn clustering(&mut self) -> Result<()> {
        let tree = hierarchical_clustering(self.require_distance()?, self.config.parameters.clustering_method)?;
        let path = self.tables("clustering.csv");
        tree.to_path(&path)?;
        self.record(path);
        Ok(())
    }

    fn network(&mut self) -> Result<()> {
        let params = &self.config.parameters;
        let edges = spearman_network(&self.relative, params.correlation_r, params.p_value);
        log::info!("Network: {} edges", edges.len());
        let path = self.config.output.networks_dir.join("spearman_edges.csv");
        edges.to_path(&path)?;
        self.record(path);
        Ok(())
    }

    fn taxon_attribution(&mut self) -> Result<()> {
        let Some(stratified) = &self.stratified else {
            log::info!("No stratified table given");
            return Ok(());
        };
        let path = self.tables("taxon_contributions.csv");
        write_taxon_contributions(&stratified.taxon_contributions(), &path)?;
        self.record(path);
        Ok(())
    }

    fn scenarios(&mut self) -> Result<()> {
        let config = self.config;
        for (name, scenario) in &config.scenarios {
            let selection_config = scenario.selection(&config.parameters);
            let selection = if selection_config.use_stratified {
                let stratified = self.stratified.as_ref().ok_or_else(|| {
                    AbrgError::Pipeline(format!(
                        "scenario '{}' uses the stratified table but none was provided",
                        name
                    ))
                })?;
                select_top_features(&stratified.to_abundance()?, &self.annotations, &selection_config)?
            } else {
                select_top_features(&self.abundance, &self.annotations, &selection_config)?
            };
            if selection.n_unannotated > 0 {
                log::debug!(
                    "scenario '{}': {} features without annotation",
                    name,
                    selection.n_unannotated
                );
            }
            log::info!("Scenario '{}': {} features selected", name, selection.len());

            let path = self.tables(&format!("top30_{}.csv", name));
            selection.to_path(&path)?;
            self.record(path);
            self.selections.insert(name.clone(), selection);
        }
        Ok(())
    }

    fn table1(&mut self) -> Result<()> {
        let rows = match self.selections.get(TABLE1_SCENARIO) {
            Some(selection) => build_table1(selection),
            None => {
                let params = &self.config.parameters;
                let config = SelectionConfig {
                    top_n: params.top30_n,
                    min_prevalence: params.prevalence_threshold,
                    ..Default::default()
                };
                build_table1(&select_top_features(&self.abundance, &self.annotations, &config)?)
            }
        };
        let path = self.tables("Table1_Top30_major_ABRGs.csv");
        write_table1(&rows, &path)?;
        self.record(path);
        Ok(())
    }

    fn time_series(&mut self) -> Result<()> {
        if !self.metadata.has_column(DAY_COLUMN) {
            self.skip(PipelineStage::TimeSeries, format!("no '{}' column", DAY_COLUMN));
            return Ok(());
        }
        let points = time_series(
            &self.relative,
            &self.metadata,
            self.config.parameters.time_series_top_n,
            DAY_COLUMN,
        )?;
        let path = self.tables("top_kos_time_series_tidy.csv");
        write_time_series(&points, &path)?;
        self.record(path);
        Ok(())
    }

    fn write_manifest(&mut self) -> Result<()> {
        let path = self.config.output.manifest.clone();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let manifest = RunManifest {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            version: env!("CARGO_PKG_VERSION"),
            project_name: self.config.project_name.as_deref(),
            parameters: &self.config.parameters,
            inputs: &self.config.input,
            outputs: &self.config.output,
            written: &self.report.written,
            skipped: &self.report.skipped,
        };
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, &manifest)?;
        writer.flush()?;
        self.record(path);
        Ok(())
    }
}

/// Run the full analysis described by `config`.
///
/// Loading or validating inputs fails the run. An analysis the data cannot
/// support (a missing column, a single group, too few samples, degenerate
/// values) is skipped with a warning and listed in the report.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport> {
    let mut state = PipelineState::load(config)?;
    for stage in PipelineStage::ALL {
        state.execute(stage)?;
    }
    log::info!("Writing manifest");
    state.write_manifest()?;
    log::info!(
        "Pipeline complete: {} files written, {} analyses skipped",
        state.report.written.len(),
        state.report.skipped.len()
    );
    Ok(state.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::config::ScenarioConfig;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn config(dir: &Path, metadata: &str) -> PipelineConfig {
        let ko_table = write(
            dir,
            "ko.csv",
            "KO,S1,S2,S3,S4,S5,S6\n\
             K1,10,12,11,30,32,31\n\
             K2,5,4,6,5,4,6\n\
             K3,1,2,3,4,5,6\n\
             K4,0,0,1,8,9,7\n",
        );
        let metadata = write(dir, "meta.csv", metadata);
        let annotations = write(
            dir,
            "ann.csv",
            "KO,gene_name,mechanism,antibiotic_class\n\
             K1,acrB,Efflux,multidrug\n\
             K2,blaTEM,Inactivation,beta-lactam\n\
             K4,tetM,Target protection,tetracycline\n",
        );
        let out = dir.join("out");
        PipelineConfig {
            project_name: None,
            input: InputConfig {
                ko_table,
                ko_stratified: None,
                metadata,
                ko_annotations: annotations,
            },
            output: OutputConfig {
                processed_dir: out.join("processed"),
                tables_dir: out.join("tables"),
                networks_dir: out.join("networks"),
                manifest: out.join("manifest.json"),
            },
            parameters: Parameters {
                top_n: 2,
                top30_n: 3,
                permutations: 99,
                correlation_r: 0.5,
                p_value: 1.0,
                ..Default::default()
            },
            comparisons: Vec::new(),
            scenarios: BTreeMap::new(),
        }
    }

    const METADATA: &str = "sample_id,period,day\n\
                            S1,early,1\nS2,early,2\nS3,early,3\n\
                            S4,late,4\nS5,late,5\nS6,late,6\n";

    #[test]
    fn test_stage_order() {
        assert_eq!(PipelineStage::ALL[0], PipelineStage::RelativeAbundance);
        assert_eq!(PipelineStage::ALL[13], PipelineStage::TimeSeries);
        let bc = PipelineStage::ALL.iter().position(|s| *s == PipelineStage::BrayCurtis);
        let perm = PipelineStage::ALL.iter().position(|s| *s == PipelineStage::Permanova);
        assert!(bc < perm);
    }

    #[test]
    fn test_default_comparison_and_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), METADATA);
        let report = run_pipeline(&config).unwrap();

        let tables = &config.output.tables_dir;
        for file in [
            "ko_richness.csv",
            "top_kos_over_time.csv",
            "differential_abundance_early_vs_late.csv",
            "differential_abundance_early_vs_late_summary.csv",
            "pca_coordinates.csv",
            "pcoa_coordinates.csv",
            "pcoa_variance.csv",
            "bray_curtis_distance.csv",
            "permanova.csv",
            "clustering.csv",
            "Table1_Top30_major_ABRGs.csv",
            "top_kos_time_series_tidy.csv",
        ] {
            assert!(report.was_written(tables.join(file)), "{} not written", file);
            assert!(tables.join(file).exists());
        }
        assert!(report.was_written(config.output.processed_dir.join("ko_relative_abundance.csv")));
        assert!(config.output.networks_dir.join("spearman_edges.csv").exists());
        assert!(report.skipped.is_empty(), "{:?}", report.skipped);

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&config.output.manifest).unwrap()).unwrap();
        assert_eq!(manifest["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(manifest["parameters"]["top_n"], 2);
        assert!(manifest["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_significant_features_lead_summary() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), METADATA);
        run_pipeline(&config).unwrap();

        let summary =
            fs::read_to_string(config.output.tables_dir.join("differential_abundance_early_vs_late_summary.csv"))
                .unwrap();
        let rows: Vec<(String, f64)> = summary
            .lines()
            .skip(1)
            .map(|line| {
                let fields: Vec<&str> = line.split(',').collect();
                (fields[0].to_string(), fields[5].parse().unwrap_or(f64::NAN))
            })
            .collect();
        let n_significant = rows.iter().filter(|(_, q)| *q < Q_VALUE_ALPHA).count();
        assert!(n_significant >= 1);
        assert_eq!(rows[0].0, "K1");
        assert!(rows[..n_significant].iter().all(|(_, q)| *q < Q_VALUE_ALPHA));
        assert!(rows[n_significant..].iter().all(|(_, q)| q.is_nan() || *q >= Q_VALUE_ALPHA));
    }

    #[test]
    fn test_missing_group_column_skips() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = "sample_id,site\nS1,a\nS2,a\nS3,a\nS4,b\nS5,b\nS6,b\n";
        let mut config = config(dir.path(), metadata);
        config.comparisons = vec![Comparison::new(
            "by_season",
            "season",
            "wet",
            "dry",
            Default::default(),
        )];
        let report = run_pipeline(&config).unwrap();

        let tables = &config.output.tables_dir;
        assert!(!tables.join("differential_abundance_by_season.csv").exists());
        assert!(!tables.join("permanova.csv").exists());
        assert!(!tables.join("top_kos_time_series_tidy.csv").exists());
        assert!(tables.join("clustering.csv").exists());
        assert_eq!(report.skipped.len(), 3);
        assert!(report.skipped[0].contains("by_season"));
    }

    #[test]
    fn test_stratified_scenario_requires_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), METADATA);
        config.scenarios.insert(
            "otu_sum".to_string(),
            ScenarioConfig {
                use_stratified: true,
                ..Default::default()
            },
        );
        assert!(matches!(run_pipeline(&config), Err(AbrgError::Pipeline(_))));
    }

    #[test]
    fn test_sample_mismatch_fails_run() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = "sample_id,period\nS1,early\nS2,early\nS3,early\nS4,late\nS5,late\n";
        let config = config(dir.path(), metadata);
        assert!(matches!(run_pipeline(&config), Err(AbrgError::SampleMismatch(_))));
        assert!(!config.output.manifest.exists());
    }
}

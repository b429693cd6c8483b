//! End-to-end resistome analysis driven by a YAML configuration.

mod config;
mod runner;

pub use config::{InputConfig, OutputConfig, Parameters, PipelineConfig, ScenarioConfig};
pub use runner::{run_pipeline, PipelineReport, PipelineStage, DAY_COLUMN, Q_VALUE_ALPHA, TABLE1_SCENARIO};

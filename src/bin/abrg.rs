//! ABRG - wastewater resistome analysis CLI
//!
//! Runs the full resistome analysis from a YAML configuration.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wwtp_abrg::error::Result;
use wwtp_abrg::pipeline::{run_pipeline, PipelineConfig};

/// Wastewater antibiotic-resistance gene analysis
#[derive(Parser)]
#[command(name = "abrg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug messages (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline from a YAML configuration file
    Run {
        /// Path to pipeline configuration YAML
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match cli.command {
        Commands::Run { config } => cmd_run(&config),
        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run the pipeline from configuration
fn cmd_run(config_path: &PathBuf) -> Result<()> {
    log::info!("Loading pipeline configuration from {:?}", config_path);
    let config = PipelineConfig::from_path(config_path)?;

    let report = run_pipeline(&config)?;

    eprintln!();
    eprintln!("Wrote {} files:", report.written.len());
    for path in &report.written {
        eprintln!("  {}", path.display());
    }
    if !report.skipped.is_empty() {
        eprintln!("Skipped:");
        for reason in &report.skipped {
            eprintln!("  {}", reason);
        }
    }
    Ok(())
}

/// Write an example configuration
fn cmd_example(output_path: &PathBuf) -> Result<()> {
    let yaml = PipelineConfig::example().to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example configuration to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for sample attribution, cluster coloring, outbreak
//! alerts, and tree-ordered distance matrices.

mod pipeline;

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use mimosa_analytics::{AnalyticsConfig, SampleFilter, outbreak_report};
use mimosa_location::{HospitalTable, LocationMode, LocationResolver, PostcodeTable};
use mimosa_phylo::{display_order, reorder_matrix};
use mimosa_sample_models::DistancePayload;
use mimosa_spatial::CountyIndex;

use crate::pipeline::{Pipeline, Refresh, load_samples};

/// Built-in configuration, used when `--config` is not given.
const DEFAULT_CONFIG: &str = include_str!("../../../mimosa.toml");

#[derive(Parser)]
#[command(name = "mimosa", about = "Cluster surveillance map tooling")]
struct Cli {
    /// Path to a TOML config file overriding the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every command that runs a full refresh.
#[derive(Args)]
struct ViewArgs {
    /// Sample features (JSON array or `FeatureCollection`)
    #[arg(long)]
    samples: PathBuf,
    /// Postcode lookup table
    #[arg(long)]
    postcodes: PathBuf,
    /// Hospital lookup table
    #[arg(long)]
    hospitals: Option<PathBuf>,
    /// County boundaries `GeoJSON`
    #[arg(long)]
    boundaries: PathBuf,
    /// Location key: "postcode" or "hospital"
    #[arg(long, default_value = "postcode")]
    mode: LocationMode,
    /// Sample filter as a JSON file
    #[arg(long)]
    filter: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Attribute counties and colors and write the annotated view as JSON
    Annotate {
        #[command(flatten)]
        view: ViewArgs,
        /// Output file (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Report clusters over the outbreak threshold
    Outbreaks {
        #[command(flatten)]
        view: ViewArgs,
        /// Print a plain-text alert instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Print the cluster color legend
    Colors {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Order samples, or a distance matrix, by phylogenetic tree leaves
    LeafOrder {
        /// Distance payload with samples, matrix and Newick tree
        #[arg(long)]
        distance: PathBuf,
        /// Comma-separated sample IDs to restrict to
        #[arg(long, value_delimiter = ',')]
        samples: Option<Vec<String>>,
        /// Emit the reordered matrix rather than just the order
        #[arg(long)]
        matrix: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AnalyticsConfig::load(path)?,
        None => AnalyticsConfig::from_toml_str(DEFAULT_CONFIG)?,
    };
    Ok(config)
}

fn load_filter(path: Option<&Path>) -> Result<SampleFilter, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(SampleFilter::default());
    };
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&contents)?)
}

fn refresh(
    config: &AnalyticsConfig,
    view: &ViewArgs,
) -> Result<Refresh, Box<dyn std::error::Error>> {
    let postcodes = PostcodeTable::load(&view.postcodes)?;
    let hospitals = match &view.hospitals {
        Some(path) => HospitalTable::load(path)?,
        None => HospitalTable::default(),
    };
    if view.mode == LocationMode::Hospital && hospitals.is_empty() {
        log::warn!("Hospital mode without a hospital table; every sample will be Unknown");
    }

    let index = CountyIndex::load(&view.boundaries)?;
    let samples = load_samples(&view.samples)?;
    let filter = load_filter(view.filter.as_deref())?;

    let pipeline = Pipeline::new(
        config,
        LocationResolver::new(postcodes, hospitals),
        index,
        view.mode,
    );
    pipeline.check_samples(&samples, Local::now().date_naive());
    log::info!("Refreshing view in {} mode", pipeline.mode());

    Ok(pipeline.refresh(&samples, &filter))
}

fn write_json<T: serde::Serialize>(
    value: &T,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Annotate { view, output } => {
            let refresh = refresh(&config, &view)?;
            write_json(&refresh, output.as_deref())?;
        }
        Commands::Outbreaks { view, text } => {
            let refresh = refresh(&config, &view)?;
            if text {
                let report = outbreak_report(&refresh.outbreaks);
                if report.is_empty() {
                    log::info!("No outbreaks detected");
                } else {
                    print!("{report}");
                }
            } else {
                write_json(&refresh.outbreaks, None)?;
            }
        }
        Commands::Colors { view } => {
            let refresh = refresh(&config, &view)?;
            println!("{:<24} {:<28} {:>5}  COLOR", "CLUSTER", "PROFILE", "COUNT");
            println!("{}", "-".repeat(70));
            for entry in &refresh.legend {
                println!(
                    "{:<24} {:<28} {:>5}  {}",
                    entry.cluster_id, entry.analysis_profile, entry.occurrences, entry.color
                );
            }
        }
        Commands::LeafOrder {
            distance,
            samples,
            matrix,
        } => {
            let contents = std::fs::read_to_string(&distance)
                .map_err(|e| format!("Failed to read {}: {e}", distance.display()))?;
            let payload: DistancePayload = serde_json::from_str(&contents)?;

            if matrix {
                let ordered = reorder_matrix(&payload, samples.as_deref());
                write_json(&ordered, None)?;
            } else {
                let selection = samples.unwrap_or_else(|| payload.samples.clone());
                for id in display_order(&payload.newick, &selection) {
                    println!("{id}");
                }
            }
        }
    }

    Ok(())
}

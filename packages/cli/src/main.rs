#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crash map pipeline.
//!
//! Logging goes through [`crash_map_cli_utils::init_logger`] so it prints
//! above the join progress bar.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use crash_map_classify::catalogue::CategoryCatalogue;
use crash_map_cli_utils::JoinProgressBar;
use crash_map_generate::config::PipelineConfig;
use crash_map_generate::{GenerateArgs, export, load_config};
use crash_map_geography::regions::{DEFAULT_NAME_PROPERTY, load_regions};
use crash_map_geography::simplify::simplify_regions;

#[derive(Parser)]
#[command(name = "crash_map", about = "Crash incident map data pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join incidents to regions, aggregate, classify, and write all outputs
    Run(RunArgs),
    /// List the category catalogue in evaluation order
    Catalogue {
        /// Custom catalogue TOML (defaults to the built-in catalogue)
        #[arg(long)]
        catalogue: Option<PathBuf>,
    },
    /// Simplify region boundaries and write them as `GeoJSON`
    Simplify {
        /// Region `GeoJSON` file
        regions: PathBuf,
        /// Output `GeoJSON` file
        #[arg(long, short)]
        output: PathBuf,
        /// Simplification tolerance in coordinate units
        #[arg(long)]
        tolerance: f64,
        /// Region property holding the region name
        #[arg(long, default_value = DEFAULT_NAME_PROPERTY)]
        name_property: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Incident `GeoJSON` file (`Point` features)
    incidents: PathBuf,
    /// Region `GeoJSON` file (`Polygon`/`MultiPolygon` features)
    regions: PathBuf,
    /// Output directory
    #[arg(long, short, default_value = "data/generated")]
    output: PathBuf,
    /// Pipeline config TOML; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Simplification tolerance in coordinate units
    #[arg(long)]
    tolerance: Option<f64>,
    /// Incident property summed per region
    #[arg(long)]
    measure_key: Option<String>,
    /// Region property holding the region name
    #[arg(long)]
    name_property: Option<String>,
    /// Comma-separated choropleth thresholds (e.g. "0,10,50,100")
    #[arg(long, value_delimiter = ',')]
    thresholds: Option<Vec<f64>>,
    /// Custom category catalogue TOML
    #[arg(long)]
    catalogue: Option<PathBuf>,
    /// Report regions with no incidents as zero totals
    #[arg(long)]
    include_empty_regions: bool,
    /// Collect unmatched incidents under this region name
    #[arg(long)]
    unmatched_bucket: Option<String>,
    /// Fail the join if it runs longer than this many seconds
    #[arg(long)]
    join_timeout_secs: Option<u64>,
}

impl RunArgs {
    /// Applies command-line overrides on top of a loaded config.
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(key) = &self.measure_key {
            config.measure_key.clone_from(key);
        }
        if let Some(property) = &self.name_property {
            config.region_name_property.clone_from(property);
        }
        if let Some(thresholds) = &self.thresholds {
            config.thresholds.clone_from(thresholds);
        }
        if self.catalogue.is_some() {
            config.catalogue_path.clone_from(&self.catalogue);
        }
        if self.include_empty_regions {
            config.include_empty_regions = true;
        }
        if self.unmatched_bucket.is_some() {
            config.unmatched_bucket.clone_from(&self.unmatched_bucket);
        }
        if self.join_timeout_secs.is_some() {
            config.join_timeout_secs = self.join_timeout_secs;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crash_map_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let mut config = load_config(args.config.as_deref())?;
            args.apply(&mut config);

            let start = Instant::now();
            let progress = JoinProgressBar::new(&multi);
            let written = crash_map_generate::generate(
                &GenerateArgs {
                    incidents: args.incidents,
                    regions: args.regions,
                    output_dir: args.output,
                },
                &config,
                Some(progress),
            )?;

            log::info!(
                "Pipeline complete: {} files in {:.1}s",
                written.len(),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Catalogue { catalogue } => {
            let catalogue = match catalogue {
                Some(path) => CategoryCatalogue::load(&path)?,
                None => CategoryCatalogue::builtin(),
            };
            println!("{:<16} MEASURE", "LABEL");
            println!("{}", "-".repeat(40));
            for entry in catalogue.entries() {
                println!("{:<16} {}", entry.label.to_string(), entry.key);
            }
        }
        Commands::Simplify {
            regions,
            output,
            tolerance,
            name_property,
        } => {
            let mut regions = load_regions(&regions, &name_property)?;
            simplify_regions(&mut regions, tolerance)?;

            let collection = export::regions_feature_collection(&regions)?;
            if let Some(parent) = output.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&output, serde_json::to_string_pretty(&collection)?)?;
            log::info!("Wrote {}", output.display());
        }
    }

    Ok(())
}

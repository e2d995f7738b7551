#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch pipeline from raw crash and region data to map-ready outputs.
//!
//! A run loads both inputs, simplifies region boundaries, joins every
//! incident to at most one region, sums a measure per region, derives
//! choropleth bins, classifies incidents into categories, and builds the
//! per-label layer data. Every stage runs in memory; output files are only
//! written once all stages have succeeded, so a failed run leaves no partial
//! output behind.

pub mod config;
pub mod export;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crash_map_analytics::AnalyticsError;
use crash_map_analytics::aggregate::{aggregate, summarize};
use crash_map_analytics::bins::{ChoroplethBins, choropleth_bins};
use crash_map_classify::ClassifyError;
use crash_map_classify::catalogue::CategoryCatalogue;
use crash_map_classify::classifier::classify_all;
use crash_map_classify::layers::LayerData;
use crash_map_crash_models::Incident;
use crash_map_geography::GeoError;
use crash_map_geography::simplify::{SimplifyReport, simplify_regions};
use crash_map_geography_models::{Region, RegionSummary, RegionTotals};
use crash_map_ingest::IngestError;
use crash_map_spatial::progress::ProgressCallback;
use crash_map_spatial::{JoinOptions, JoinResult, RegionIndex, SpatialError, join};
use thiserror::Error;

use crate::config::PipelineConfig;

/// Errors that can abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Incident input could not be loaded.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Region input could not be loaded or simplified.
    #[error(transparent)]
    Geography(#[from] GeoError),

    /// The spatial join failed.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// Aggregation or binning failed.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// The category catalogue could not be loaded.
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// The pipeline config is malformed.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Output write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything a successful run produces, before it is written out.
#[derive(Debug)]
pub struct PipelineOutput<'a> {
    /// Regions after simplification, in input order.
    pub regions: Vec<Region>,
    /// Simplification counters.
    pub simplify: SimplifyReport,
    /// One join result per incident, in input order.
    pub joins: Vec<JoinResult>,
    /// Summed measure per region.
    pub totals: RegionTotals,
    /// Choropleth bins, when thresholds are configured.
    pub bins: Option<ChoroplethBins>,
    /// Join counters.
    pub summary: RegionSummary,
    /// Per-label layers and the flattened annotated collection.
    pub layers: LayerData<'a>,
}

/// Runs every stage over already-loaded inputs.
///
/// `regions` is consumed: it is simplified in place, then frozen for the
/// join. Nothing is written to disk.
///
/// # Errors
///
/// Returns [`PipelineError`] if any stage fails. No partial output is
/// returned.
pub fn run_pipeline<'a>(
    incidents: &'a [Incident],
    mut regions: Vec<Region>,
    catalogue: &CategoryCatalogue,
    config: &PipelineConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<PipelineOutput<'a>, PipelineError> {
    let simplify = simplify_regions(&mut regions, config.tolerance)?;

    let deadline = config.join_timeout().map(|timeout| Instant::now() + timeout);

    let joins = {
        let index = RegionIndex::build(&regions);
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(SpatialError::DeadlineExceeded {
                processed: 0,
                total: incidents.len(),
            }
            .into());
        }
        join(&index, incidents, &JoinOptions { deadline, progress })?
    };

    let totals = aggregate(&regions, incidents, &joins, &config.aggregate_options())?;
    let summary = summarize(&regions, &joins);

    let bins = if config.thresholds.is_empty() {
        None
    } else {
        Some(choropleth_bins(&config.thresholds, &totals)?)
    };

    let labeled = classify_all(catalogue, incidents);
    let layers = LayerData::build(catalogue, &labeled);

    Ok(PipelineOutput {
        regions,
        simplify,
        joins,
        totals,
        bins,
        summary,
        layers,
    })
}

/// Input and output locations for [`generate`].
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    /// Incident `GeoJSON` file.
    pub incidents: PathBuf,
    /// Region `GeoJSON` file.
    pub regions: PathBuf,
    /// Directory receiving the output files.
    pub output_dir: PathBuf,
}

/// Loads inputs, runs the pipeline, and writes every output file.
///
/// Returns the paths written.
///
/// # Errors
///
/// Returns [`PipelineError`] if loading, any stage, or writing fails. When a
/// stage fails nothing is written.
pub fn generate(
    args: &GenerateArgs,
    config: &PipelineConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<Vec<PathBuf>, PipelineError> {
    let catalogue = config.catalogue()?;
    let incidents = crash_map_ingest::load_incidents(&args.incidents)?;
    let regions =
        crash_map_geography::regions::load_regions(&args.regions, &config.region_name_property)?;

    let output = run_pipeline(&incidents, regions, &catalogue, config, progress)?;

    export::write_outputs(&args.output_dir, &output)
}

/// Loads a config file if one is given, otherwise the defaults.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, PipelineError> {
    path.map_or_else(|| Ok(PipelineConfig::default()), PipelineConfig::load)
}

//! Writes pipeline results to an output directory.
//!
//! All documents are rendered in memory first, then staged as `.tmp`
//! siblings. Only once every file is staged are they renamed into place, so
//! a failed write leaves the previous run's outputs untouched. Outputs the
//! current run does not produce are removed afterwards.

use std::path::{Path, PathBuf};

use crash_map_geography_models::{BoundaryStatus, Region, RegionSummary};
use serde::Serialize;

use crate::{PipelineError, PipelineOutput};

/// Simplified region boundaries.
pub const REGIONS_FILE: &str = "regions.geojson";

/// `{region name: total}`.
pub const REGION_TOTALS_FILE: &str = "region_totals.json";

/// Choropleth bin bounds.
pub const CHOROPLETH_BINS_FILE: &str = "choropleth_bins.json";

/// `{label: [Feature...]}`.
pub const LAYERS_FILE: &str = "layers.json";

/// One point feature per (incident, label) pair.
pub const INCIDENTS_BY_CATEGORY_FILE: &str = "incidents_by_category.geojson";

/// Run summary.
pub const SUMMARY_FILE: &str = "summary.json";

/// Every file [`write_outputs`] may produce.
pub const OUTPUT_FILES: &[&str] = &[
    REGIONS_FILE,
    REGION_TOTALS_FILE,
    CHOROPLETH_BINS_FILE,
    LAYERS_FILE,
    INCIDENTS_BY_CATEGORY_FILE,
    SUMMARY_FILE,
];

/// Incident count for one category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Category label.
    pub label: String,
    /// Incidents holding the label.
    pub incidents: usize,
}

/// Contents of [`SUMMARY_FILE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Join counters.
    #[serde(flatten)]
    pub regions: RegionSummary,
    /// Vertex count before simplification.
    pub vertices_before: usize,
    /// Vertex count after simplification.
    pub vertices_after: usize,
    /// Regions whose input geometry could not be read.
    pub malformed_regions: Vec<String>,
    /// Regions whose boundary collapsed during simplification.
    pub degenerate_regions: Vec<String>,
    /// Incidents with no category label.
    pub unclassified_incidents: usize,
    /// Per-label counts in catalogue order.
    pub categories: Vec<CategoryCount>,
}

impl RunSummary {
    /// Builds the summary for a pipeline result.
    #[must_use]
    pub fn from_output(output: &PipelineOutput<'_>) -> Self {
        let malformed_regions = output
            .regions
            .iter()
            .filter(|r| matches!(r.status, BoundaryStatus::Malformed { .. }))
            .map(|r| r.name.clone())
            .collect();

        let categories = output
            .layers
            .layers
            .iter()
            .map(|layer| CategoryCount {
                label: layer.label.to_string(),
                incidents: layer.incidents.len(),
            })
            .collect();

        Self {
            regions: output.summary,
            vertices_before: output.simplify.vertices_before,
            vertices_after: output.simplify.vertices_after,
            malformed_regions,
            degenerate_regions: output.simplify.degenerate.clone(),
            unclassified_incidents: output.layers.unclassified.len(),
            categories,
        }
    }
}

/// Renders regions as a `GeoJSON` `FeatureCollection`.
///
/// A region with an empty boundary is emitted with a `null` geometry so it
/// keeps its place in the collection.
///
/// # Errors
///
/// Returns [`PipelineError::Json`] if a geometry cannot be serialized.
pub fn regions_feature_collection(regions: &[Region]) -> Result<serde_json::Value, PipelineError> {
    let features = regions
        .iter()
        .map(|region| {
            let geometry = if region.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::to_value(geojson::Geometry::new(geojson::Value::from(
                    &region.boundary,
                )))?
            };

            Ok(serde_json::json!({
                "type": "Feature",
                "geometry": geometry,
                "properties": {
                    "name": region.name,
                    "boundaryStatus": region.status.as_str(),
                },
            }))
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    Ok(serde_json::json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}

/// Renders every output document, keyed by file name.
///
/// # Errors
///
/// Returns [`PipelineError::Json`] if any document cannot be serialized.
pub fn render_outputs(
    output: &PipelineOutput<'_>,
) -> Result<Vec<(&'static str, serde_json::Value)>, PipelineError> {
    let mut documents = vec![
        (REGIONS_FILE, regions_feature_collection(&output.regions)?),
        (REGION_TOTALS_FILE, serde_json::to_value(&output.totals)?),
    ];

    if let Some(bins) = &output.bins {
        documents.push((CHOROPLETH_BINS_FILE, serde_json::to_value(bins)?));
    }

    documents.push((LAYERS_FILE, output.layers.layers_json()));
    documents.push((
        INCIDENTS_BY_CATEGORY_FILE,
        output.layers.annotated_feature_collection(),
    ));
    documents.push((
        SUMMARY_FILE,
        serde_json::to_value(RunSummary::from_output(output))?,
    ));

    Ok(documents)
}

/// Writes every output document into `dir`, creating it if needed.
///
/// Returns the paths written, in write order. A known output file that this
/// run did not produce (e.g. bins from an earlier run with thresholds) is
/// deleted.
///
/// # Errors
///
/// Returns [`PipelineError`] if a document cannot be serialized or a file
/// cannot be written. If staging fails, no existing output is replaced.
pub fn write_outputs(dir: &Path, output: &PipelineOutput<'_>) -> Result<Vec<PathBuf>, PipelineError> {
    let documents = render_outputs(output)?;
    let rendered = documents
        .into_iter()
        .map(|(name, doc)| Ok((name, serde_json::to_string_pretty(&doc)?)))
        .collect::<Result<Vec<_>, PipelineError>>()?;

    std::fs::create_dir_all(dir)?;

    let staged = stage_outputs(dir, &rendered)?;

    let mut written = Vec::with_capacity(staged.len());
    for (tmp_path, path) in staged {
        std::fs::rename(&tmp_path, &path)?;
        log::info!("Wrote {}", path.display());
        written.push(path);
    }

    for name in OUTPUT_FILES {
        if rendered.iter().any(|(rendered_name, _)| rendered_name == name) {
            continue;
        }
        let stale = dir.join(name);
        match std::fs::remove_file(&stale) {
            Ok(()) => log::info!("Removed stale {}", stale.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(written)
}

/// Writes each document to its `.tmp` path. On failure, every `.tmp` file
/// already written is removed before the error is returned.
fn stage_outputs(
    dir: &Path,
    rendered: &[(&'static str, String)],
) -> Result<Vec<(PathBuf, PathBuf)>, PipelineError> {
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(rendered.len());

    for (name, contents) in rendered {
        let tmp_path = dir.join(format!("{name}.tmp"));
        if let Err(e) = std::fs::write(&tmp_path, contents) {
            log::warn!("Failed to stage {}: {e}", tmp_path.display());
            for (tmp, _) in &staged {
                let _ = std::fs::remove_file(tmp);
            }
            return Err(e.into());
        }
        staged.push((tmp_path, dir.join(name)));
    }

    Ok(staged)
}

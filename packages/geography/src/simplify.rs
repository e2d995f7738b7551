//! In-place boundary simplification for region datasets.
//!
//! Each ring is simplified with Ramer-Douglas-Peucker under a single
//! tolerance. Collapsed holes are dropped and a collapsed exterior drops the
//! whole part. A part that is no longer a valid polygon is kept in its
//! original form, and if the reassembled parts overlap each other the whole
//! region keeps its original boundary. A region that loses every part keeps
//! its name with an empty boundary and is marked
//! [`BoundaryStatus::Degenerate`].

use crash_map_geography_models::{BoundaryStatus, Region};
use geo::{Area as _, LineString, MultiPolygon, Polygon, Simplify as _, Validation as _};

use crate::GeoError;

/// Counters describing one simplification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimplifyReport {
    /// Number of regions processed.
    pub regions: usize,
    /// Total vertex count before simplification.
    pub vertices_before: usize,
    /// Total vertex count after simplification.
    pub vertices_after: usize,
    /// Names of regions whose boundary collapsed entirely.
    pub degenerate: Vec<String>,
    /// Polygon parts left unsimplified because the result would have been
    /// invalid, either on its own or together with its sibling parts.
    pub kept_original_parts: usize,
}

/// Outcome of simplifying one polygon part.
enum PartOutcome {
    Simplified(Polygon<f64>),
    KeptOriginal(Polygon<f64>),
    Collapsed,
}

/// Simplifies every region boundary in place.
///
/// A tolerance of zero leaves every boundary untouched. Region count,
/// names, and order never change.
///
/// # Errors
///
/// Returns [`GeoError::InvalidTolerance`] if `tolerance` is negative or not
/// finite. No region is modified in that case.
pub fn simplify_regions(regions: &mut [Region], tolerance: f64) -> Result<SimplifyReport, GeoError> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(GeoError::InvalidTolerance { tolerance });
    }

    let vertices_before = regions.iter().map(Region::vertex_count).sum();

    let mut report = SimplifyReport {
        regions: regions.len(),
        vertices_before,
        vertices_after: vertices_before,
        ..SimplifyReport::default()
    };

    if tolerance == 0.0 {
        log::debug!("Simplification tolerance is zero, boundaries unchanged");
        return Ok(report);
    }

    for region in regions.iter_mut() {
        if region.is_empty() {
            continue;
        }

        let (boundary, kept_original) = simplify_boundary(&region.boundary, tolerance);
        report.kept_original_parts += kept_original;

        if boundary.0.is_empty() {
            log::warn!(
                "Region {}: boundary collapsed at tolerance {tolerance}, keeping empty boundary",
                region.name
            );
            region.status = BoundaryStatus::Degenerate;
            report.degenerate.push(region.name.clone());
        }

        region.boundary = boundary;
    }

    report.vertices_after = regions.iter().map(Region::vertex_count).sum();

    log::info!(
        "Simplified {} regions at tolerance {tolerance}: {} -> {} vertices ({} degenerate, {} parts kept unsimplified)",
        report.regions,
        report.vertices_before,
        report.vertices_after,
        report.degenerate.len(),
        report.kept_original_parts,
    );

    Ok(report)
}

/// Simplifies each part of a boundary. Returns the new boundary and the
/// number of parts that had to be kept unsimplified.
fn simplify_boundary(boundary: &MultiPolygon<f64>, tolerance: f64) -> (MultiPolygon<f64>, usize) {
    let mut parts = Vec::with_capacity(boundary.0.len());
    let mut kept_original = 0;

    for polygon in &boundary.0 {
        match simplify_polygon(polygon, tolerance) {
            PartOutcome::Simplified(p) => parts.push(p),
            PartOutcome::KeptOriginal(p) => {
                kept_original += 1;
                parts.push(p);
            }
            PartOutcome::Collapsed => {}
        }
    }

    let simplified = MultiPolygon(parts);

    // Parts are simplified independently and may now overlap a neighbour.
    if simplified.0.len() > 1 && !simplified.is_valid() {
        log::debug!(
            "Simplified parts overlap at tolerance {tolerance}, keeping original boundary"
        );
        return (boundary.clone(), boundary.0.len());
    }

    (simplified, kept_original)
}

fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> PartOutcome {
    let exterior = polygon.exterior().simplify(tolerance);
    if is_collapsed(&exterior) {
        return PartOutcome::Collapsed;
    }

    let interiors: Vec<LineString<f64>> = polygon
        .interiors()
        .iter()
        .map(|ring| ring.simplify(tolerance))
        .filter(|ring| !is_collapsed(ring))
        .collect();

    let candidate = Polygon::new(exterior, interiors);
    if candidate.is_valid() {
        PartOutcome::Simplified(candidate)
    } else {
        PartOutcome::KeptOriginal(polygon.clone())
    }
}

/// A ring is collapsed when it no longer encloses any area.
fn is_collapsed(ring: &LineString<f64>) -> bool {
    ring.0.len() < 4
        || !ring.is_closed()
        || Polygon::new(ring.clone(), Vec::new()).unsigned_area() <= 0.0
}

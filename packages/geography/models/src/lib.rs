#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Named region boundary and regional summary types.
//!
//! These types represent the polygons incidents are grouped by and the
//! per-region totals produced from the spatial join. Boundaries are held as
//! [`MultiPolygon`]s so single polygons and multi-part regions share one
//! code path.

use std::collections::BTreeMap;

use crash_map_crash_models::MeasureTotal;
use geo::{CoordsIter as _, MultiPolygon};
use serde::{Deserialize, Serialize};

/// Condition of a region's boundary after loading and simplification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BoundaryStatus {
    /// Boundary is a usable polygon set.
    Valid,
    /// Input geometry could not be read as a polygon; boundary is empty.
    Malformed {
        /// Why the geometry was rejected.
        reason: String,
    },
    /// Simplification collapsed every polygon part; boundary is empty.
    Degenerate,
}

impl BoundaryStatus {
    /// Short lowercase name used in exported properties.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Malformed { .. } => "malformed",
            Self::Degenerate => "degenerate",
        }
    }
}

/// A named region boundary.
///
/// The name is the region's identity and is unique within a loaded
/// dataset. The boundary is replaced in place by simplification.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Unique region name.
    pub name: String,
    /// Region boundary; empty when malformed or degenerate.
    pub boundary: MultiPolygon<f64>,
    /// Boundary condition.
    pub status: BoundaryStatus,
}

impl Region {
    /// Creates a region with a valid boundary.
    #[must_use]
    pub fn new(name: impl Into<String>, boundary: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            boundary,
            status: BoundaryStatus::Valid,
        }
    }

    /// Creates a region whose geometry could not be read. The region keeps
    /// its identity with an empty boundary.
    #[must_use]
    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            boundary: MultiPolygon(Vec::new()),
            status: BoundaryStatus::Malformed {
                reason: reason.into(),
            },
        }
    }

    /// Returns `true` if the region has no polygon parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boundary.0.is_empty()
    }

    /// Total number of coordinates across all rings.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.boundary.coords_count()
    }
}

/// Summed measure per region name.
pub type RegionTotals = BTreeMap<String, MeasureTotal>;

/// Join and aggregation counters for a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    /// Number of incidents considered.
    pub total_incidents: usize,
    /// Incidents that joined to a region.
    pub matched_incidents: usize,
    /// Incidents that joined to no region.
    pub unmatched_incidents: usize,
    /// Number of regions in the dataset.
    pub region_count: usize,
    /// Regions that received at least one incident.
    pub regions_with_incidents: usize,
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    #[test]
    fn malformed_region_is_empty() {
        let region = Region::malformed("Gamma", "geometry is null");
        assert!(region.is_empty());
        assert_eq!(region.vertex_count(), 0);
        assert_eq!(region.status.as_str(), "malformed");
    }

    #[test]
    fn counts_vertices() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let region = Region::new("Alpha", MultiPolygon(vec![square]));
        assert!(!region.is_empty());
        assert_eq!(region.vertex_count(), 5);
        assert_eq!(region.status, BoundaryStatus::Valid);
    }

    #[test]
    fn status_serializes_with_kind_tag() {
        let json = serde_json::to_value(BoundaryStatus::Malformed {
            reason: "bad".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"kind": "malformed", "reason": "bad"}));
    }
}

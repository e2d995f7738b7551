#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index and point-in-polygon join for regions.
//!
//! Builds an R-tree over region bounding boxes once the region set has been
//! simplified, then associates each incident with at most one region. The
//! index borrows the regions, so the region set is read-only for the whole
//! join.

pub mod progress;

use std::sync::Arc;
use std::time::Instant;

use crash_map_crash_models::Incident;
use crash_map_geography_models::Region;
use geo::{BoundingRect as _, Intersects as _, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;

use crate::progress::ProgressCallback;

/// How many incidents are joined between deadline checks and progress
/// updates.
const CHECK_INTERVAL: usize = 1024;

/// Errors that can occur during the spatial join.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The join did not finish before its deadline. No results are returned.
    #[error("Spatial join exceeded its deadline after {processed} of {total} incidents")]
    DeadlineExceeded {
        /// Incidents joined before the deadline passed.
        processed: usize,
        /// Total incidents in the batch.
        total: usize,
    },
}

/// The region (if any) an incident was joined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinResult {
    /// Index of the incident in the input collection.
    pub incident: usize,
    /// Position of the matched region in the region set.
    pub region: Option<usize>,
}

/// A region boundary stored in the R-tree with its input position.
struct RegionEntry<'a> {
    position: usize,
    envelope: AABB<[f64; 2]>,
    boundary: &'a MultiPolygon<f64>,
}

impl RTreeObject for RegionEntry<'_> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over region boundaries.
///
/// Regions with an empty boundary are not indexed and never match.
pub struct RegionIndex<'a> {
    regions: &'a [Region],
    tree: RTree<RegionEntry<'a>>,
}

impl<'a> RegionIndex<'a> {
    /// Builds the index from a fully simplified region set.
    #[must_use]
    pub fn build(regions: &'a [Region]) -> Self {
        let entries: Vec<RegionEntry<'a>> = regions
            .iter()
            .enumerate()
            .filter_map(|(position, region)| {
                let envelope = compute_envelope(&region.boundary)?;
                Some(RegionEntry {
                    position,
                    envelope,
                    boundary: &region.boundary,
                })
            })
            .collect();

        let skipped = regions.len() - entries.len();
        if skipped > 0 {
            log::warn!("{skipped} regions have an empty boundary and will not match any incident");
        }

        let tree = RTree::bulk_load(entries);
        log::info!("Loaded {} regions into spatial index", tree.size());

        Self { regions, tree }
    }

    /// Number of indexed (non-empty) regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if no region is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Returns the region at a position in the region set.
    #[must_use]
    pub fn region(&self, position: usize) -> Option<&'a Region> {
        self.regions.get(position)
    }

    /// Looks up the region position for a point.
    ///
    /// Boundary points count as inside. When the point intersects more than
    /// one region, the region that comes first in the region set wins,
    /// regardless of R-tree traversal order.
    #[must_use]
    pub fn lookup(&self, lng: f64, lat: f64) -> Option<usize> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.boundary.intersects(&point))
            .map(|entry| entry.position)
            .min()
    }

    /// Looks up the region name for a point.
    #[must_use]
    pub fn lookup_name(&self, lng: f64, lat: f64) -> Option<&'a str> {
        self.lookup(lng, lat)
            .and_then(|position| self.region(position))
            .map(|region| region.name.as_str())
    }
}

/// Options for [`join`].
#[derive(Clone, Default)]
pub struct JoinOptions {
    /// Fail the join if it is still running at this instant.
    pub deadline: Option<Instant>,
    /// Receives one unit of progress per joined incident.
    pub progress: Option<Arc<dyn ProgressCallback>>,
}

/// Joins every incident to at most one region.
///
/// Returns exactly one [`JoinResult`] per incident, in input order.
/// Incidents outside every region get `region: None`.
///
/// # Errors
///
/// Returns [`SpatialError::DeadlineExceeded`] if the deadline passes before
/// the join completes. Partial results are discarded.
pub fn join(
    index: &RegionIndex<'_>,
    incidents: &[Incident],
    options: &JoinOptions,
) -> Result<Vec<JoinResult>, SpatialError> {
    let total = incidents.len();
    let progress = options
        .progress
        .clone()
        .unwrap_or_else(progress::null_progress);
    progress.set_total(total as u64);
    progress.set_message(format!("Joining {total} incidents to {} regions", index.len()));

    let mut results = Vec::with_capacity(total);
    let mut reported = 0usize;

    for (i, incident) in incidents.iter().enumerate() {
        if i % CHECK_INTERVAL == 0 {
            if options.deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(SpatialError::DeadlineExceeded {
                    processed: i,
                    total,
                });
            }
            progress.inc((i - reported) as u64);
            reported = i;
        }

        let region = index.lookup(incident.lng, incident.lat);
        if region.is_none() {
            log::debug!(
                "Incident {} at ({}, {}) is outside every region",
                incident.index,
                incident.lng,
                incident.lat
            );
        }

        results.push(JoinResult {
            incident: incident.index,
            region,
        });
    }

    let matched = results.iter().filter(|r| r.region.is_some()).count();
    progress.inc((total - reported) as u64);
    progress.finish(format!("Joined {matched}/{total} incidents"));
    log::info!("Joined {matched}/{total} incidents to a region");

    Ok(results)
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
/// Returns `None` for an empty boundary.
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    fn square(name: &str, x: f64, y: f64) -> Region {
        Region::new(
            name,
            MultiPolygon(vec![polygon![
                (x: x, y: y),
                (x: x + 1.0, y: y),
                (x: x + 1.0, y: y + 1.0),
                (x: x, y: y + 1.0),
            ]]),
        )
    }

    fn incident(index: usize, lng: f64, lat: f64) -> Incident {
        Incident::new(index, lng, lat, serde_json::Map::new())
    }

    #[test]
    fn point_inside_joins_region() {
        let regions = vec![square("Alpha", 0.0, 0.0), square("Beta", 5.0, 5.0)];
        let index = RegionIndex::build(&regions);

        assert_eq!(index.lookup_name(0.5, 0.5), Some("Alpha"));
        assert_eq!(index.lookup_name(5.5, 5.5), Some("Beta"));
        assert_eq!(index.lookup_name(3.0, 3.0), None);
    }

    #[test]
    fn point_on_edge_counts_as_inside() {
        let regions = vec![square("Alpha", 0.0, 0.0)];
        let index = RegionIndex::build(&regions);

        assert_eq!(index.lookup_name(1.0, 0.5), Some("Alpha"));
        assert_eq!(index.lookup_name(0.0, 0.0), Some("Alpha"));
    }

    #[test]
    fn shared_boundary_goes_to_first_region() {
        let regions = vec![square("Alpha", 0.0, 0.0), square("Beta", 1.0, 0.0)];
        let index = RegionIndex::build(&regions);
        for _ in 0..5 {
            assert_eq!(index.lookup_name(1.0, 0.5), Some("Alpha"));
        }

        let reversed = vec![square("Beta", 1.0, 0.0), square("Alpha", 0.0, 0.0)];
        let index = RegionIndex::build(&reversed);
        assert_eq!(index.lookup_name(1.0, 0.5), Some("Beta"));
    }

    #[test]
    fn join_keeps_input_order_and_unmatched() {
        let regions = vec![square("Alpha", 0.0, 0.0), square("Beta", 5.0, 5.0)];
        let index = RegionIndex::build(&regions);
        let incidents = vec![
            incident(0, 5.5, 5.5),
            incident(1, 10.0, 10.0),
            incident(2, 0.5, 0.5),
        ];

        let results = join(&index, &incidents, &JoinOptions::default()).unwrap();

        assert_eq!(
            results,
            vec![
                JoinResult { incident: 0, region: Some(1) },
                JoinResult { incident: 1, region: None },
                JoinResult { incident: 2, region: Some(0) },
            ]
        );
    }

    #[test]
    fn identical_points_join_independently() {
        let regions = vec![square("Alpha", 0.0, 0.0), square("Beta", 2.0, 0.0)];
        let index = RegionIndex::build(&regions);
        let incidents = vec![
            incident(0, 0.5, 0.5),
            incident(1, 2.5, 0.5),
            incident(2, 0.5, 0.5),
            incident(3, 2.5, 0.5),
        ];

        let results = join(&index, &incidents, &JoinOptions::default()).unwrap();
        let regions: Vec<Option<usize>> = results.iter().map(|r| r.region).collect();

        assert_eq!(regions, vec![Some(0), Some(1), Some(0), Some(1)]);
    }

    #[test]
    fn empty_boundary_never_matches() {
        let regions = vec![Region::malformed("Gamma", "null"), square("Alpha", 0.0, 0.0)];
        let index = RegionIndex::build(&regions);

        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup(0.5, 0.5), Some(1));
    }

    #[test]
    fn expired_deadline_fails_whole_join() {
        let regions = vec![square("Alpha", 0.0, 0.0)];
        let index = RegionIndex::build(&regions);
        let incidents = vec![incident(0, 0.5, 0.5)];
        let options = JoinOptions {
            deadline: Some(Instant::now()),
            progress: None,
        };

        let err = join(&index, &incidents, &options).unwrap_err();

        assert!(matches!(
            err,
            SpatialError::DeadlineExceeded { processed: 0, total: 1 }
        ));
    }

    #[derive(Default)]
    struct RecordingProgress {
        total: std::sync::Mutex<u64>,
        position: std::sync::Mutex<u64>,
        finished: std::sync::Mutex<Option<String>>,
    }

    impl ProgressCallback for RecordingProgress {
        fn set_total(&self, total: u64) {
            *self.total.lock().unwrap() = total;
        }

        fn inc(&self, delta: u64) {
            *self.position.lock().unwrap() += delta;
        }

        fn set_message(&self, _msg: String) {}

        fn finish(&self, msg: String) {
            *self.finished.lock().unwrap() = Some(msg);
        }
    }

    #[test]
    fn join_reports_one_unit_per_incident() {
        let regions = vec![square("Alpha", 0.0, 0.0)];
        let index = RegionIndex::build(&regions);
        let incidents: Vec<Incident> = (0..1500)
            .map(|i| {
                let lng = if i % 3 == 0 { 9.0 } else { 0.5 };
                incident(i, lng, 0.5)
            })
            .collect();
        let recorder = Arc::new(RecordingProgress::default());
        let options = JoinOptions {
            deadline: None,
            progress: Some(recorder.clone()),
        };

        join(&index, &incidents, &options).unwrap();

        assert_eq!(*recorder.total.lock().unwrap(), 1500);
        assert_eq!(*recorder.position.lock().unwrap(), 1500);
        assert_eq!(
            recorder.finished.lock().unwrap().as_deref(),
            Some("Joined 1000/1500 incidents")
        );
    }
}

//! Sums one incident measure per joined region.

use crash_map_crash_models::{Incident, MeasureTotal};
use crash_map_geography_models::{Region, RegionSummary, RegionTotals};
use crash_map_spatial::JoinResult;

use crate::AnalyticsError;

/// Default measure summed per region.
pub const DEFAULT_MEASURE_KEY: &str = "total";

/// How join results are turned into region totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Incident property to sum.
    pub measure_key: String,
    /// Report every region, with a zero total when nothing joined to it.
    pub include_empty_regions: bool,
    /// Collect unmatched incidents under this synthetic region name instead
    /// of leaving them out.
    pub unmatched_bucket: Option<String>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            measure_key: DEFAULT_MEASURE_KEY.to_string(),
            include_empty_regions: false,
            unmatched_bucket: None,
        }
    }
}

/// Sums `options.measure_key` over the incidents joined to each region.
///
/// `joins` must hold one result per incident, in the same order as
/// `incidents` (as returned by [`crash_map_spatial::join`]). A missing or
/// non-numeric measure counts as zero. A region with joined incidents is
/// always present in the output, even if its total is zero.
///
/// # Errors
///
/// Returns [`AnalyticsError::JoinMismatch`] if `joins` and `incidents`
/// differ in length, or [`AnalyticsError::BucketNameCollision`] if the
/// unmatched bucket shares a name with a region.
pub fn aggregate(
    regions: &[Region],
    incidents: &[Incident],
    joins: &[JoinResult],
    options: &AggregateOptions,
) -> Result<RegionTotals, AnalyticsError> {
    if incidents.len() != joins.len() {
        return Err(AnalyticsError::JoinMismatch {
            incidents: incidents.len(),
            joins: joins.len(),
        });
    }

    if let Some(bucket) = &options.unmatched_bucket
        && regions.iter().any(|r| &r.name == bucket)
    {
        return Err(AnalyticsError::BucketNameCollision {
            name: bucket.clone(),
        });
    }

    let mut totals = RegionTotals::new();

    if options.include_empty_regions {
        for region in regions {
            totals.insert(region.name.clone(), MeasureTotal::default());
        }
    }

    let mut missing = 0usize;

    for (incident, join) in incidents.iter().zip(joins) {
        let name = match join.region.and_then(|position| regions.get(position)) {
            Some(region) => region.name.as_str(),
            None => match &options.unmatched_bucket {
                Some(bucket) => bucket.as_str(),
                None => continue,
            },
        };

        let total = totals.entry(name.to_string()).or_default();
        match incident.measure(&options.measure_key) {
            Some(measure) => total.add(measure),
            None => missing += 1,
        }
    }

    if missing > 0 {
        log::debug!(
            "{missing} joined incidents have no numeric `{}` measure, counted as zero",
            options.measure_key
        );
    }
    log::info!(
        "Aggregated `{}` into {} region totals",
        options.measure_key,
        totals.len()
    );

    Ok(totals)
}

/// Merges a partial set of totals into `into`.
///
/// Addition is commutative and associative, so totals computed over
/// disjoint incident batches can be merged in any order.
pub fn merge_totals(into: &mut RegionTotals, other: RegionTotals) {
    for (name, total) in other {
        into.entry(name).or_default().merge(total);
    }
}

/// Counts matched and unmatched incidents for a join.
#[must_use]
pub fn summarize(regions: &[Region], joins: &[JoinResult]) -> RegionSummary {
    let matched_incidents = joins.iter().filter(|j| j.region.is_some()).count();

    let mut hit = vec![false; regions.len()];
    for position in joins.iter().filter_map(|j| j.region) {
        if let Some(flag) = hit.get_mut(position) {
            *flag = true;
        }
    }

    RegionSummary {
        total_incidents: joins.len(),
        matched_incidents,
        unmatched_incidents: joins.len() - matched_incidents,
        region_count: regions.len(),
        regions_with_incidents: hit.iter().filter(|&&h| h).count(),
    }
}

#[cfg(test)]
mod tests {
    use crash_map_crash_models::Measure;
    use geo::{MultiPolygon, polygon};

    use super::*;

    fn region(name: &str) -> Region {
        Region::new(
            name,
            MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
            ]]),
        )
    }

    fn incident(index: usize, props: serde_json::Value) -> Incident {
        let serde_json::Value::Object(properties) = props else {
            panic!("fixture properties must be an object");
        };
        Incident::new(index, 0.0, 0.0, properties)
    }

    fn joined(pairs: &[Option<usize>]) -> Vec<JoinResult> {
        pairs
            .iter()
            .enumerate()
            .map(|(incident, &region)| JoinResult { incident, region })
            .collect()
    }

    #[test]
    fn sums_per_region() {
        let regions = vec![region("Alpha"), region("Beta")];
        let incidents = vec![
            incident(0, serde_json::json!({"total": 5, "fatal": 1})),
            incident(1, serde_json::json!({"total": 3, "rear_end": 2})),
            incident(2, serde_json::json!({"total": 4})),
        ];
        let joins = joined(&[Some(0), Some(1), Some(0)]);

        let totals = aggregate(&regions, &incidents, &joins, &AggregateOptions::default()).unwrap();

        assert_eq!(totals.len(), 2);
        assert_eq!(totals["Alpha"], MeasureTotal::Integer(9));
        assert_eq!(totals["Beta"], MeasureTotal::Integer(3));
    }

    #[test]
    fn unmatched_incidents_are_excluded() {
        let regions = vec![region("Alpha"), region("Beta")];
        let incidents = vec![
            incident(0, serde_json::json!({"total": 5})),
            incident(1, serde_json::json!({"total": 7})),
        ];
        let joins = joined(&[Some(0), None]);

        let totals = aggregate(&regions, &incidents, &joins, &AggregateOptions::default()).unwrap();

        assert_eq!(totals.len(), 1);
        assert_eq!(totals["Alpha"], MeasureTotal::Integer(5));
        assert!(!totals.contains_key("Beta"));

        let sum_totals: f64 = totals.values().copied().map(MeasureTotal::as_f64).sum();
        let sum_all: f64 = incidents
            .iter()
            .filter_map(|i| i.measure("total"))
            .map(Measure::as_f64)
            .sum();
        assert!(sum_totals <= sum_all);
    }

    #[test]
    fn missing_measure_counts_as_zero() {
        let regions = vec![region("Alpha")];
        let incidents = vec![
            incident(0, serde_json::json!({"fatal": 1})),
            incident(1, serde_json::json!({"total": "n/a"})),
        ];
        let joins = joined(&[Some(0), Some(0)]);

        let totals = aggregate(&regions, &incidents, &joins, &AggregateOptions::default()).unwrap();

        assert_eq!(totals["Alpha"], MeasureTotal::Integer(0));
    }

    #[test]
    fn zero_fills_when_requested() {
        let regions = vec![region("Alpha"), region("Beta")];
        let incidents = vec![incident(0, serde_json::json!({"total": 2}))];
        let joins = joined(&[Some(1)]);
        let options = AggregateOptions {
            include_empty_regions: true,
            ..AggregateOptions::default()
        };

        let totals = aggregate(&regions, &incidents, &joins, &options).unwrap();

        assert_eq!(totals["Alpha"], MeasureTotal::Integer(0));
        assert_eq!(totals["Beta"], MeasureTotal::Integer(2));
    }

    #[test]
    fn unmatched_bucket_collects_outsiders() {
        let regions = vec![region("Alpha")];
        let incidents = vec![
            incident(0, serde_json::json!({"total": 1})),
            incident(1, serde_json::json!({"total": 2.5})),
        ];
        let joins = joined(&[Some(0), None]);
        let options = AggregateOptions {
            unmatched_bucket: Some("Unknown".to_string()),
            ..AggregateOptions::default()
        };

        let totals = aggregate(&regions, &incidents, &joins, &options).unwrap();

        assert_eq!(totals["Alpha"], MeasureTotal::Integer(1));
        assert_eq!(totals["Unknown"], MeasureTotal::Float(2.5));
    }

    #[test]
    fn unmatched_bucket_cannot_shadow_region() {
        let regions = vec![region("Alpha")];
        let options = AggregateOptions {
            unmatched_bucket: Some("Alpha".to_string()),
            ..AggregateOptions::default()
        };

        let err = aggregate(&regions, &[], &[], &options).unwrap_err();
        assert!(matches!(err, AnalyticsError::BucketNameCollision { .. }));
    }

    #[test]
    fn rejects_misaligned_joins() {
        let regions = vec![region("Alpha")];
        let incidents = vec![incident(0, serde_json::json!({"total": 1}))];

        let err = aggregate(&regions, &incidents, &[], &AggregateOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::JoinMismatch { incidents: 1, joins: 0 }
        ));
    }

    #[test]
    fn merging_partials_matches_single_pass() {
        let regions = vec![region("Alpha"), region("Beta")];
        let incidents = vec![
            incident(0, serde_json::json!({"total": 1})),
            incident(1, serde_json::json!({"total": 2})),
            incident(2, serde_json::json!({"total": 3})),
            incident(3, serde_json::json!({"total": 4})),
        ];
        let joins = joined(&[Some(0), Some(1), Some(1), Some(0)]);
        let options = AggregateOptions::default();

        let whole = aggregate(&regions, &incidents, &joins, &options).unwrap();
        let mut merged = aggregate(&regions, &incidents[2..], &joins[2..], &options).unwrap();
        merge_totals(
            &mut merged,
            aggregate(&regions, &incidents[..2], &joins[..2], &options).unwrap(),
        );

        assert_eq!(merged, whole);
    }

    #[test]
    fn summarizes_join() {
        let regions = vec![region("Alpha"), region("Beta"), region("Gamma")];
        let joins = joined(&[Some(0), None, Some(0), Some(2)]);

        let summary = summarize(&regions, &joins);

        assert_eq!(summary.total_incidents, 4);
        assert_eq!(summary.matched_incidents, 3);
        assert_eq!(summary.unmatched_incidents, 1);
        assert_eq!(summary.region_count, 3);
        assert_eq!(summary.regions_with_incidents, 2);
    }
}

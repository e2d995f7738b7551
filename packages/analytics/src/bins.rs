//! Choropleth bin bounds for region totals.
//!
//! Bin edges are an externally supplied increasing list of thresholds,
//! with the largest observed region total appended as the final edge so
//! that every region falls inside some bin.

use crash_map_crash_models::MeasureTotal;
use crash_map_geography_models::RegionTotals;
use serde::{Deserialize, Serialize};

use crate::AnalyticsError;

/// Bin edges for choropleth bucketing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoroplethBins {
    /// Strictly increasing bin edges.
    pub bounds: Vec<f64>,
    /// Largest region total, if any region has a total.
    pub observed_max: Option<f64>,
}

impl ChoroplethBins {
    /// Number of bins (one fewer than the number of edges).
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.bounds.len().saturating_sub(1)
    }

    /// Returns the bin a value falls into.
    ///
    /// Bin `i` covers `[bounds[i], bounds[i + 1])`; the last bin also
    /// includes its upper edge. Values outside the edges have no bin.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        let last = self.bounds.len().checked_sub(2)?;
        self.bounds
            .windows(2)
            .position(|edge| value >= edge[0] && value < edge[1])
            .or_else(|| (value == self.bounds[last + 1]).then_some(last))
    }
}

/// Builds bin edges from `thresholds` and the observed maximum total.
///
/// The observed maximum is appended when it exceeds the last threshold.
/// With no thresholds the result is just the observed maximum.
///
/// # Errors
///
/// Returns [`AnalyticsError::NonMonotonicThresholds`] if a threshold is not
/// finite or the list is not strictly increasing.
pub fn choropleth_bins(
    thresholds: &[f64],
    totals: &RegionTotals,
) -> Result<ChoroplethBins, AnalyticsError> {
    let increasing = thresholds.iter().all(|t| t.is_finite())
        && thresholds.windows(2).all(|pair| pair[0] < pair[1]);
    if !increasing {
        return Err(AnalyticsError::NonMonotonicThresholds {
            thresholds: thresholds.to_vec(),
        });
    }

    let observed_max = totals
        .values()
        .copied()
        .map(MeasureTotal::as_f64)
        .reduce(f64::max);

    let mut bounds = thresholds.to_vec();
    if let Some(max) = observed_max
        && bounds.last().is_none_or(|&last| max > last)
    {
        bounds.push(max);
    }

    Ok(ChoroplethBins {
        bounds,
        observed_max,
    })
}

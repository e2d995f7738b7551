#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-region aggregation of incident measures.
//!
//! Turns the output of the spatial join into a `{region name: total}`
//! mapping and derives choropleth bin bounds from it. Totals are plain sums,
//! so partial results computed over disjoint incident batches can be merged
//! in any order.

pub mod aggregate;
pub mod bins;

use thiserror::Error;

/// Errors that can occur during aggregation.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Choropleth thresholds are not strictly increasing finite numbers.
    #[error("Choropleth thresholds must be finite and strictly increasing: {thresholds:?}")]
    NonMonotonicThresholds {
        /// The rejected thresholds.
        thresholds: Vec<f64>,
    },

    /// The configured unmatched bucket has the same name as a real region.
    #[error("Unmatched bucket name {name:?} collides with a region name")]
    BucketNameCollision {
        /// The colliding name.
        name: String,
    },

    /// Join results do not line up with the incident collection.
    #[error("Got {joins} join results for {incidents} incidents")]
    JoinMismatch {
        /// Number of incidents.
        incidents: usize,
        /// Number of join results.
        joins: usize,
    },
}

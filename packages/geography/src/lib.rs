#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region boundary loading and geometry simplification.
//!
//! Reads named polygon regions from a `GeoJSON` `FeatureCollection` and
//! reduces their vertex density with Ramer-Douglas-Peucker simplification
//! before they are indexed for the spatial join. Simplification is applied
//! in place and the original precision is discarded.

pub mod regions;
pub mod simplify;

use thiserror::Error;

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// File read failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is not a `GeoJSON` `FeatureCollection`.
    #[error("Expected a GeoJSON FeatureCollection: {message}")]
    NotFeatureCollection {
        /// Description of what was found instead.
        message: String,
    },

    /// A region feature has no usable name.
    #[error("Region feature {index} has no `{property}` property")]
    MissingRegionName {
        /// Position of the feature in the collection.
        index: usize,
        /// The name property that was looked up.
        property: String,
    },

    /// Two region features share a name.
    #[error("Duplicate region name: {name}")]
    DuplicateRegionName {
        /// The repeated name.
        name: String,
    },

    /// Simplification tolerance is negative or not finite.
    #[error("Invalid simplification tolerance: {tolerance}")]
    InvalidTolerance {
        /// The rejected tolerance.
        tolerance: f64,
    },
}

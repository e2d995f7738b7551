#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crash incident loading.
//!
//! Reads a `GeoJSON` `FeatureCollection` of `Point` features into
//! [`Incident`] records. Properties are carried through untouched; only the
//! point coordinates are interpreted here. Any feature that is not a point
//! with two finite coordinates makes the whole collection unusable.

use std::path::Path;

use crash_map_crash_models::Incident;
use thiserror::Error;

/// Errors that can occur while loading incidents.
#[derive(Debug, Error)]
pub enum IngestError {
    /// File read failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input is JSON but not a `FeatureCollection`.
    #[error("Incident input is not a FeatureCollection: {message}")]
    NotFeatureCollection {
        /// What was found instead.
        message: String,
    },

    /// A feature has no usable point coordinate.
    #[error("Incident {index} has an invalid coordinate: {message}")]
    InvalidCoordinate {
        /// Feature position in the input.
        index: usize,
        /// Description of the problem.
        message: String,
    },
}

/// Reads and parses an incident `GeoJSON` file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or any feature is not
/// a valid point.
pub fn load_incidents(path: &Path) -> Result<Vec<Incident>, IngestError> {
    log::info!("Loading incidents from {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    parse_incidents(&json)
}

/// Parses incidents from an already-decoded `GeoJSON` document.
///
/// # Errors
///
/// Returns [`IngestError`] if the document is not a `FeatureCollection` or
/// a feature is not a point with finite `[lng, lat]` coordinates.
pub fn parse_incidents(json: &serde_json::Value) -> Result<Vec<Incident>, IngestError> {
    match json.get("type").and_then(serde_json::Value::as_str) {
        Some("FeatureCollection") => {}
        other => {
            return Err(IngestError::NotFeatureCollection {
                message: format!("type is {}", other.unwrap_or("missing")),
            });
        }
    }

    let features = json
        .get("features")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| IngestError::NotFeatureCollection {
            message: "no features array".to_string(),
        })?;

    let incidents = features
        .iter()
        .enumerate()
        .map(|(index, feature)| parse_feature(index, feature))
        .collect::<Result<Vec<_>, _>>()?;

    log::info!("Loaded {} incidents", incidents.len());

    Ok(incidents)
}

fn parse_feature(index: usize, feature: &serde_json::Value) -> Result<Incident, IngestError> {
    let invalid = |message: &str| IngestError::InvalidCoordinate {
        index,
        message: message.to_string(),
    };

    let geometry = feature
        .get("geometry")
        .filter(|g| !g.is_null())
        .ok_or_else(|| invalid("missing geometry"))?;

    if geometry.get("type").and_then(serde_json::Value::as_str) != Some("Point") {
        return Err(invalid("geometry is not a Point"));
    }

    let coords = geometry
        .get("coordinates")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| invalid("missing coordinates"))?;

    let (Some(lng), Some(lat)) = (
        coords.first().and_then(serde_json::Value::as_f64),
        coords.get(1).and_then(serde_json::Value::as_f64),
    ) else {
        return Err(invalid("coordinates are not numeric"));
    };

    if !lng.is_finite() || !lat.is_finite() {
        return Err(invalid("coordinates are not finite"));
    }

    let properties = match feature.get("properties") {
        Some(serde_json::Value::Object(map)) => map.clone(),
        _ => serde_json::Map::new(),
    };

    Ok(Incident::new(index, lng, lat, properties))
}

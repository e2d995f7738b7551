//! Loads named region boundaries from a `GeoJSON` `FeatureCollection`.
//!
//! A feature without a usable name, or a name repeated within the dataset,
//! is structurally invalid and fails the whole load. A feature whose
//! geometry cannot be read as a polygon is kept as a malformed region with
//! an empty boundary, so it still shows up in the region set.

use std::collections::BTreeSet;
use std::path::Path;

use crash_map_geography_models::Region;
use geo::MultiPolygon;
use geojson::GeoJson;

use crate::GeoError;

/// Default property holding the region name.
pub const DEFAULT_NAME_PROPERTY: &str = "name";

/// Reads and parses a region `GeoJSON` file.
///
/// # Errors
///
/// Returns [`GeoError`] if the file cannot be read, is not a
/// `FeatureCollection`, or contains a feature with a missing or duplicate
/// name.
pub fn load_regions(path: &Path, name_property: &str) -> Result<Vec<Region>, GeoError> {
    log::info!("Loading regions from {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    parse_regions(&json, name_property)
}

/// Parses regions from an already-decoded `GeoJSON` document.
///
/// Region order follows feature order; that order is what the spatial join
/// uses to break ties between overlapping regions.
///
/// # Errors
///
/// Returns [`GeoError`] if the document is not a `FeatureCollection` or a
/// feature has a missing or duplicate name.
pub fn parse_regions(
    json: &serde_json::Value,
    name_property: &str,
) -> Result<Vec<Region>, GeoError> {
    let features = feature_array(json)?;

    let mut seen = BTreeSet::new();
    let mut regions = Vec::with_capacity(features.len());
    let mut malformed = 0usize;

    for (index, feature) in features.iter().enumerate() {
        let name = region_name(feature, name_property).ok_or_else(|| {
            GeoError::MissingRegionName {
                index,
                property: name_property.to_string(),
            }
        })?;

        if !seen.insert(name.clone()) {
            return Err(GeoError::DuplicateRegionName { name });
        }

        let region = match feature.get("geometry").map(parse_boundary) {
            Some(Ok(boundary)) => Region::new(name, boundary),
            Some(Err(reason)) => {
                log::warn!("Region {name}: malformed geometry ({reason}), keeping empty boundary");
                malformed += 1;
                Region::malformed(name, reason)
            }
            None => {
                log::warn!("Region {name}: no geometry, keeping empty boundary");
                malformed += 1;
                Region::malformed(name, "missing geometry")
            }
        };

        regions.push(region);
    }

    log::info!(
        "Loaded {} regions ({malformed} with malformed geometry)",
        regions.len()
    );

    Ok(regions)
}

/// Returns the `features` array of a `FeatureCollection`.
fn feature_array(json: &serde_json::Value) -> Result<&Vec<serde_json::Value>, GeoError> {
    match json.get("type").and_then(serde_json::Value::as_str) {
        Some("FeatureCollection") => {}
        other => {
            return Err(GeoError::NotFeatureCollection {
                message: format!("type is {}", other.unwrap_or("missing")),
            });
        }
    }

    json.get("features")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| GeoError::NotFeatureCollection {
            message: "no features array".to_string(),
        })
}

/// Extracts a non-empty region name. Integer names (e.g. numeric region
/// codes) are accepted and stringified.
fn region_name(feature: &serde_json::Value, name_property: &str) -> Option<String> {
    let value = feature.get("properties")?.get(name_property)?;

    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn parse_boundary(geometry: &serde_json::Value) -> Result<MultiPolygon<f64>, String> {
    if geometry.is_null() {
        return Err("geometry is null".to_string());
    }

    let geojson: GeoJson = serde_json::to_string(geometry)
        .map_err(|e| e.to_string())?
        .parse()
        .map_err(|e: geojson::Error| e.to_string())?;

    let GeoJson::Geometry(geom) = geojson else {
        return Err("not a geometry object".to_string());
    };

    let geo_geom: geo::Geometry<f64> = geom
        .try_into()
        .map_err(|e: geojson::Error| e.to_string())?;

    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        _ => Err("geometry is not a Polygon or MultiPolygon".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use crash_map_geography_models::BoundaryStatus;

    use super::*;

    fn square_geometry(x: f64, y: f64) -> serde_json::Value {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[
                [x, y], [x + 1.0, y], [x + 1.0, y + 1.0], [x, y + 1.0], [x, y]
            ]]
        })
    }

    fn feature(name: &serde_json::Value, geometry: &serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "type": "Feature",
            "properties": { "name": name },
            "geometry": geometry,
        })
    }

    #[test]
    fn parses_polygons_and_multipolygons_in_order() {
        let json = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                feature(&serde_json::json!("Alpha"), &square_geometry(0.0, 0.0)),
                feature(&serde_json::json!("Beta"), &serde_json::json!({
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[2.0, 0.0], [3.0, 0.0], [3.0, 1.0], [2.0, 0.0]]],
                        [[[4.0, 0.0], [5.0, 0.0], [5.0, 1.0], [4.0, 0.0]]]
                    ]
                })),
            ]
        });

        let regions = parse_regions(&json, DEFAULT_NAME_PROPERTY).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name, "Alpha");
        assert_eq!(regions[0].boundary.0.len(), 1);
        assert_eq!(regions[1].name, "Beta");
        assert_eq!(regions[1].boundary.0.len(), 2);
        assert!(regions.iter().all(|r| r.status == BoundaryStatus::Valid));
    }

    #[test]
    fn keeps_region_with_malformed_geometry() {
        let json = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                feature(&serde_json::json!("Alpha"), &serde_json::Value::Null),
                feature(&serde_json::json!("Beta"), &serde_json::json!({
                    "type": "Point",
                    "coordinates": [1.0, 2.0]
                })),
            ]
        });

        let regions = parse_regions(&json, DEFAULT_NAME_PROPERTY).unwrap();
        assert_eq!(regions.len(), 2);
        assert!(regions.iter().all(Region::is_empty));
        assert!(
            regions
                .iter()
                .all(|r| matches!(r.status, BoundaryStatus::Malformed { .. }))
        );
    }

    #[test]
    fn missing_name_is_fatal() {
        let json = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                feature(&serde_json::json!("Alpha"), &square_geometry(0.0, 0.0)),
                feature(&serde_json::json!("  "), &square_geometry(1.0, 0.0)),
            ]
        });

        let err = parse_regions(&json, DEFAULT_NAME_PROPERTY).unwrap_err();
        assert!(matches!(err, GeoError::MissingRegionName { index: 1, .. }));
    }

    #[test]
    fn duplicate_name_is_fatal() {
        let json = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                feature(&serde_json::json!("Alpha"), &square_geometry(0.0, 0.0)),
                feature(&serde_json::json!("Alpha"), &square_geometry(1.0, 0.0)),
            ]
        });

        let err = parse_regions(&json, DEFAULT_NAME_PROPERTY).unwrap_err();
        assert!(matches!(err, GeoError::DuplicateRegionName { name } if name == "Alpha"));
    }

    #[test]
    fn numeric_names_are_stringified() {
        let json = serde_json::json!({
            "type": "FeatureCollection",
            "features": [feature(&serde_json::json!(4000), &square_geometry(0.0, 0.0))]
        });

        let regions = parse_regions(&json, DEFAULT_NAME_PROPERTY).unwrap();
        assert_eq!(regions[0].name, "4000");
    }

    #[test]
    fn rejects_non_collection() {
        let json = serde_json::json!({"type": "Feature"});
        assert!(matches!(
            parse_regions(&json, DEFAULT_NAME_PROPERTY),
            Err(GeoError::NotFeatureCollection { .. })
        ));
    }
}

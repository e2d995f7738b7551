#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Crash incident, measure, and category label types.
//!
//! This crate defines the point-located [`Incident`] record shared by every
//! stage of the crash-map pipeline, the numeric [`Measure`] values read from
//! its properties, and the closed set of [`CategoryLabel`]s that incidents
//! are classified into.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Category buckets an incident can be classified into.
///
/// The variant order here is only the declaration order; the order that
/// matters for output is the order of the category catalogue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum CategoryLabel {
    // ── Severity ────────────────────────────────────────
    /// At least one person killed
    Fatal,
    /// At least one person hospitalised
    SeriousInjury,
    /// At least one person with minor or medically treated injuries
    MinorInjury,
    /// Property damage only
    PropertyDamage,

    // ── Collision type ──────────────────────────────────
    /// Rear-end collision
    RearEnd,
    /// Head-on collision
    HeadOn,
    /// Side-swipe collision
    SideSwipe,
    /// Angle collision (intersection, turning)
    Angle,
    /// Vehicle struck a pedestrian
    HitPedestrian,
    /// Vehicle struck a fixed or temporary object
    HitObject,
    /// Vehicle overturned
    Rollover,
}

impl CategoryLabel {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Fatal,
            Self::SeriousInjury,
            Self::MinorInjury,
            Self::PropertyDamage,
            Self::RearEnd,
            Self::HeadOn,
            Self::SideSwipe,
            Self::Angle,
            Self::HitPedestrian,
            Self::HitObject,
            Self::Rollover,
        ]
    }
}

/// A numeric value read from an incident property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    /// Integral JSON number.
    Integer(i64),
    /// Any other finite JSON number.
    Float(f64),
}

impl Measure {
    /// Returns `true` if the value is strictly greater than zero.
    #[must_use]
    pub fn is_positive(self) -> bool {
        match self {
            Self::Integer(v) => v > 0,
            Self::Float(v) => v > 0.0,
        }
    }

    /// Returns the value widened to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    /// Reads a measure from a JSON value.
    ///
    /// Only JSON numbers are measures. Strings, booleans, nulls, and
    /// non-finite floats yield `None`.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        if let Some(v) = value.as_i64() {
            return Some(Self::Integer(v));
        }
        value
            .as_f64()
            .filter(|v| v.is_finite())
            .map(Self::Float)
    }
}

/// Running sum of [`Measure`]s.
///
/// Stays [`MeasureTotal::Integer`] while every summand is an integer and
/// switches to [`MeasureTotal::Float`] once a float is added or the integer
/// sum would overflow. Serializes as a plain JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasureTotal {
    /// Sum of integer measures.
    Integer(i64),
    /// Sum involving at least one float measure.
    Float(f64),
}

impl Default for MeasureTotal {
    fn default() -> Self {
        Self::Integer(0)
    }
}

impl MeasureTotal {
    /// Adds a single measure to the total.
    pub fn add(&mut self, measure: Measure) {
        let current = *self;
        *self = match (current, measure) {
            (Self::Integer(total), Measure::Integer(v)) => total.checked_add(v).map_or_else(
                || Self::Float(current.as_f64() + measure.as_f64()),
                Self::Integer,
            ),
            _ => Self::Float(current.as_f64() + measure.as_f64()),
        };
    }

    /// Merges another partial total into this one.
    pub fn merge(&mut self, other: Self) {
        match other {
            Self::Integer(v) => self.add(Measure::Integer(v)),
            Self::Float(v) => self.add(Measure::Float(v)),
        }
    }

    /// Returns the total widened to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

/// A single point-located crash record.
///
/// Identity is the position of the record in its input collection. The
/// property mapping is kept exactly as loaded so it can be passed through to
/// rendering output untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Position within the input collection.
    pub index: usize,
    /// Longitude (WGS84 or the dataset's projected X).
    pub lng: f64,
    /// Latitude (WGS84 or the dataset's projected Y).
    pub lat: f64,
    /// Original feature properties.
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Incident {
    /// Creates an incident from its parts.
    #[must_use]
    pub const fn new(
        index: usize,
        lng: f64,
        lat: f64,
        properties: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            index,
            lng,
            lat,
            properties,
        }
    }

    /// Returns the numeric measure stored under `key`, if any.
    #[must_use]
    pub fn measure(&self, key: &str) -> Option<Measure> {
        self.properties.get(key).and_then(Measure::from_json)
    }

    /// Returns this incident as a `GeoJSON` `Feature` with its original
    /// properties.
    #[must_use]
    pub fn to_feature(&self) -> serde_json::Value {
        self.feature_with_properties(self.properties.clone())
    }

    /// Returns this incident as a `GeoJSON` `Feature` with one extra
    /// property set (overwriting any existing value under the same key).
    #[must_use]
    pub fn to_feature_with(&self, key: &str, value: &str) -> serde_json::Value {
        let mut properties = self.properties.clone();
        properties.insert(
            key.to_string(),
            serde_json::Value::String(value.to_string()),
        );
        self.feature_with_properties(properties)
    }

    fn feature_with_properties(
        &self,
        properties: serde_json::Map<String, serde_json::Value>,
    ) -> serde_json::Value {
        serde_json::json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [self.lng, self.lat]
            },
            "properties": properties,
        })
    }
}

//! Per-label incident layers and the flattened annotated collection.
//!
//! Rendering needs two views of the same data: every incident holding a
//! given label, and one global point set where each point carries a single
//! label. An incident with three labels is listed once under each of its
//! three layers and emitted three times in the flat collection.

use crash_map_crash_models::{CategoryLabel, Incident};

use crate::catalogue::CategoryCatalogue;
use crate::classifier::LabeledIncident;

/// Property added to each flattened record naming its label.
pub const CATEGORY_PROPERTY: &str = "category";

/// All incidents holding one label, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayer<'a> {
    /// The layer's label.
    pub label: CategoryLabel,
    /// Incidents holding the label.
    pub incidents: Vec<&'a Incident>,
}

/// One (incident, label) pair of the flattened collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotatedIncident<'a> {
    /// The incident.
    pub incident: &'a Incident,
    /// The single label this record carries.
    pub label: CategoryLabel,
}

impl AnnotatedIncident<'_> {
    /// `GeoJSON` feature with the original properties plus
    /// [`CATEGORY_PROPERTY`].
    #[must_use]
    pub fn to_feature(&self) -> serde_json::Value {
        self.incident
            .to_feature_with(CATEGORY_PROPERTY, self.label.as_ref())
    }
}

/// Layer data handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerData<'a> {
    /// One layer per catalogue entry, in catalogue order. Layers with no
    /// incidents are kept so the layer set is stable across datasets.
    pub layers: Vec<LabelLayer<'a>>,
    /// One record per (incident, label) pair, incident-major.
    pub annotated: Vec<AnnotatedIncident<'a>>,
    /// Indices of incidents with no label.
    pub unclassified: Vec<usize>,
}

impl<'a> LayerData<'a> {
    /// Groups labeled incidents by label and flattens them.
    #[must_use]
    pub fn build(catalogue: &CategoryCatalogue, labeled: &[LabeledIncident<'a>]) -> Self {
        let mut layers: Vec<LabelLayer<'a>> = catalogue
            .labels()
            .map(|label| LabelLayer {
                label,
                incidents: Vec::new(),
            })
            .collect();
        let mut annotated = Vec::new();
        let mut unclassified = Vec::new();

        for item in labeled {
            if item.is_unclassified() {
                unclassified.push(item.incident.index);
                continue;
            }

            for &label in &item.labels {
                if let Some(position) = catalogue.position(label) {
                    layers[position].incidents.push(item.incident);
                }
                annotated.push(AnnotatedIncident {
                    incident: item.incident,
                    label,
                });
            }
        }

        if !unclassified.is_empty() {
            log::info!(
                "{} incidents match no category and are left out of every layer",
                unclassified.len()
            );
        }

        Self {
            layers,
            annotated,
            unclassified,
        }
    }

    /// Returns the layer for a label.
    #[must_use]
    pub fn layer(&self, label: CategoryLabel) -> Option<&LabelLayer<'a>> {
        self.layers.iter().find(|l| l.label == label)
    }

    /// `{label: [Feature...]}` for every layer.
    #[must_use]
    pub fn layers_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .layers
            .iter()
            .map(|layer| {
                let features = layer.incidents.iter().map(|i| i.to_feature()).collect();
                (layer.label.to_string(), serde_json::Value::Array(features))
            })
            .collect();
        serde_json::Value::Object(map)
    }

    /// The flattened collection as a `GeoJSON` `FeatureCollection`.
    #[must_use]
    pub fn annotated_feature_collection(&self) -> serde_json::Value {
        let features: Vec<serde_json::Value> = self
            .annotated
            .iter()
            .map(AnnotatedIncident::to_feature)
            .collect();

        serde_json::json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

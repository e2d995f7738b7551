//! Ordered category catalogue, loaded from TOML.
//!
//! The built-in catalogue is embedded at compile time via [`include_str!`].
//! A dataset with different property names can supply its own TOML file
//! with the same `[[categories]]` layout.

use std::collections::BTreeSet;
use std::path::Path;

use crash_map_crash_models::{CategoryLabel, Incident};
use serde::{Deserialize, Serialize};

use crate::ClassifyError;

/// Built-in catalogue TOML.
const DEFAULT_CATALOGUE_TOML: &str = include_str!("../catalogues/default.toml");

/// One catalogue entry: a label and the measure that triggers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// Label assigned when the measure is positive.
    pub label: CategoryLabel,
    /// Incident property holding the measure.
    pub key: String,
}

impl CategoryEntry {
    /// Returns `true` if the incident's measure is present and strictly
    /// greater than zero. A missing or non-numeric measure never matches.
    #[must_use]
    pub fn matches(&self, incident: &Incident) -> bool {
        incident
            .measure(&self.key)
            .is_some_and(crash_map_crash_models::Measure::is_positive)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    categories: Vec<CategoryEntry>,
}

/// Immutable, ordered list of category entries.
///
/// Built once and passed by reference to the classifier. The entry order is
/// the label order on every classified incident and the layer order in the
/// output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalogue {
    entries: Vec<CategoryEntry>,
}

impl CategoryCatalogue {
    /// Builds a catalogue from entries.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if `entries` is empty, a label repeats, or a
    /// measure key is blank.
    pub fn from_entries(entries: Vec<CategoryEntry>) -> Result<Self, ClassifyError> {
        if entries.is_empty() {
            return Err(ClassifyError::EmptyCatalogue);
        }

        let mut seen = BTreeSet::new();
        for entry in &entries {
            if entry.key.trim().is_empty() {
                return Err(ClassifyError::EmptyMeasureKey { label: entry.label });
            }
            if !seen.insert(entry.label) {
                return Err(ClassifyError::DuplicateLabel { label: entry.label });
            }
        }

        Ok(Self { entries })
    }

    /// Parses a catalogue from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the TOML is malformed or the entries are
    /// invalid.
    pub fn parse_toml(toml_str: &str) -> Result<Self, ClassifyError> {
        let file: CatalogueFile = toml::de::from_str(toml_str)?;
        Self::from_entries(file.categories)
    }

    /// Reads a catalogue from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ClassifyError> {
        log::info!("Loading category catalogue from {}", path.display());
        Self::parse_toml(&std::fs::read_to_string(path)?)
    }

    /// Returns the built-in catalogue.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (this is a compile-time
    /// guarantee since the config is embedded and covered by tests).
    #[must_use]
    pub fn builtin() -> Self {
        Self::parse_toml(DEFAULT_CATALOGUE_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse built-in catalogue: {e}"))
    }

    /// Entries in catalogue order.
    #[must_use]
    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    /// Labels in catalogue order.
    pub fn labels(&self) -> impl Iterator<Item = CategoryLabel> + '_ {
        self.entries.iter().map(|e| e.label)
    }

    /// Position of a label in the catalogue.
    #[must_use]
    pub fn position(&self, label: CategoryLabel) -> Option<usize> {
        self.entries.iter().position(|e| e.label == label)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` for a constructed catalogue.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_label_once() {
        let catalogue = CategoryCatalogue::builtin();
        assert_eq!(catalogue.len(), CategoryLabel::all().len());

        let labels: Vec<CategoryLabel> = catalogue.labels().collect();
        assert_eq!(labels, CategoryLabel::all());
        assert_eq!(catalogue.entries()[0].key, "fatal");
        assert_eq!(catalogue.position(CategoryLabel::RearEnd), Some(4));
    }

    #[test]
    fn parses_custom_order() {
        let toml_str = r#"
[[categories]]
label = "RearEnd"
key = "Count_RearEnd"

[[categories]]
label = "Fatal"
key = "Count_Casualty_Fatality"
"#;
        let catalogue = CategoryCatalogue::parse_toml(toml_str).unwrap();
        let labels: Vec<CategoryLabel> = catalogue.labels().collect();
        assert_eq!(labels, vec![CategoryLabel::RearEnd, CategoryLabel::Fatal]);
    }

    #[test]
    fn rejects_duplicate_labels() {
        let toml_str = r#"
[[categories]]
label = "Fatal"
key = "fatal"

[[categories]]
label = "Fatal"
key = "killed"
"#;
        let err = CategoryCatalogue::parse_toml(toml_str).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::DuplicateLabel {
                label: CategoryLabel::Fatal
            }
        ));
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert!(matches!(
            CategoryCatalogue::from_entries(Vec::new()),
            Err(ClassifyError::EmptyCatalogue)
        ));
        assert!(matches!(
            CategoryCatalogue::from_entries(vec![CategoryEntry {
                label: CategoryLabel::HeadOn,
                key: " ".to_string(),
            }]),
            Err(ClassifyError::EmptyMeasureKey { .. })
        ));
    }

    #[test]
    fn rejects_unknown_label() {
        let toml_str = r#"
[[categories]]
label = "Meteor"
key = "meteor"
"#;
        assert!(matches!(
            CategoryCatalogue::parse_toml(toml_str),
            Err(ClassifyError::Toml(_))
        ));
    }
}

//! Pipeline configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) runs the
//! pipeline with no simplification, the `total` measure, the built-in
//! category catalogue, and no join deadline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crash_map_analytics::aggregate::{AggregateOptions, DEFAULT_MEASURE_KEY};
use crash_map_classify::catalogue::CategoryCatalogue;
use crash_map_geography::regions::DEFAULT_NAME_PROPERTY;
use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Simplification tolerance in coordinate units. `0` disables
    /// simplification.
    pub tolerance: f64,
    /// Incident property summed per region.
    pub measure_key: String,
    /// Region property holding the region name.
    pub region_name_property: String,
    /// Report regions with no joined incidents as zero totals.
    pub include_empty_regions: bool,
    /// Synthetic region name collecting unmatched incidents.
    pub unmatched_bucket: Option<String>,
    /// Choropleth bin thresholds, strictly increasing.
    pub thresholds: Vec<f64>,
    /// Custom category catalogue. The built-in one is used when unset.
    pub catalogue_path: Option<PathBuf>,
    /// Upper bound on index construction plus join, in seconds.
    pub join_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.0,
            measure_key: DEFAULT_MEASURE_KEY.to_string(),
            region_name_property: DEFAULT_NAME_PROPERTY.to_string(),
            include_empty_regions: false,
            unmatched_bucket: None,
            thresholds: Vec::new(),
            catalogue_path: None,
            join_timeout_secs: None,
        }
    }
}

impl PipelineConfig {
    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the TOML is malformed or names
    /// an unknown field.
    pub fn parse_toml(toml_str: &str) -> Result<Self, PipelineError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        log::info!("Loading pipeline config from {}", path.display());
        Self::parse_toml(&std::fs::read_to_string(path)?)
    }

    /// Aggregation settings derived from this config.
    #[must_use]
    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            measure_key: self.measure_key.clone(),
            include_empty_regions: self.include_empty_regions,
            unmatched_bucket: self.unmatched_bucket.clone(),
        }
    }

    /// Join deadline as a [`Duration`].
    #[must_use]
    pub fn join_timeout(&self) -> Option<Duration> {
        self.join_timeout_secs.map(Duration::from_secs)
    }

    /// Loads the configured catalogue, or the built-in one.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Classify`] if a custom catalogue cannot be
    /// loaded.
    pub fn catalogue(&self) -> Result<CategoryCatalogue, PipelineError> {
        match &self.catalogue_path {
            Some(path) => Ok(CategoryCatalogue::load(path)?),
            None => Ok(CategoryCatalogue::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = PipelineConfig::parse_toml("").unwrap();

        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.measure_key, "total");
        assert_eq!(config.region_name_property, "name");
        assert_eq!(config.join_timeout(), None);
    }

    #[test]
    fn parses_all_fields() {
        let config = PipelineConfig::parse_toml(
            r#"
tolerance = 0.001
measure_key = "Total_Crashes"
region_name_property = "suburb"
include_empty_regions = true
unmatched_bucket = "Unmatched"
thresholds = [0.0, 10.0, 100.0]
catalogue_path = "catalogues/sa.toml"
join_timeout_secs = 30
"#,
        )
        .unwrap();

        assert!((config.tolerance - 0.001).abs() < f64::EPSILON);
        assert_eq!(config.region_name_property, "suburb");
        assert_eq!(config.thresholds, vec![0.0, 10.0, 100.0]);
        assert_eq!(config.join_timeout(), Some(Duration::from_secs(30)));

        let options = config.aggregate_options();
        assert_eq!(options.measure_key, "Total_Crashes");
        assert!(options.include_empty_regions);
        assert_eq!(options.unmatched_bucket.as_deref(), Some("Unmatched"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = PipelineConfig::parse_toml("tolerence = 1.0").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn missing_catalogue_file_is_an_error() {
        let config = PipelineConfig {
            catalogue_path: Some(PathBuf::from("/nonexistent/catalogue.toml")),
            ..PipelineConfig::default()
        };
        assert!(matches!(config.catalogue(), Err(PipelineError::Classify(_))));
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Multi-label crash classification and map layer data.
//!
//! An incident is assigned every [`CategoryLabel`] whose catalogue measure
//! is a positive number, so one crash can be both `Fatal` and `HeadOn`.
//! The labeled incidents are then grouped per label and flattened into one
//! record per (incident, label) pair for the rendering layer.
//!
//! [`CategoryLabel`]: crash_map_crash_models::CategoryLabel

pub mod catalogue;
pub mod classifier;
pub mod layers;

use crash_map_crash_models::CategoryLabel;
use thiserror::Error;

/// Errors that can occur while loading a category catalogue.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Catalogue file read failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalogue TOML is malformed.
    #[error("Catalogue parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The catalogue defines no categories.
    #[error("Category catalogue is empty")]
    EmptyCatalogue,

    /// A label appears more than once.
    #[error("Category {label} is defined more than once")]
    DuplicateLabel {
        /// The repeated label.
        label: CategoryLabel,
    },

    /// A category has a blank measure key.
    #[error("Category {label} has an empty measure key")]
    EmptyMeasureKey {
        /// The offending label.
        label: CategoryLabel,
    },
}

//! Per-incident category assignment.

use crash_map_crash_models::{CategoryLabel, Incident};

use crate::catalogue::CategoryCatalogue;

/// An incident with every label it satisfies, in catalogue order.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledIncident<'a> {
    /// The classified incident.
    pub incident: &'a Incident,
    /// Matching labels; empty when no category measure is positive.
    pub labels: Vec<CategoryLabel>,
}

impl LabeledIncident<'_> {
    /// Returns `true` if the incident matched no category.
    #[must_use]
    pub fn is_unclassified(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Evaluates every catalogue entry against one incident.
#[must_use]
pub fn classify<'a>(catalogue: &CategoryCatalogue, incident: &'a Incident) -> LabeledIncident<'a> {
    let labels = catalogue
        .entries()
        .iter()
        .filter(|entry| entry.matches(incident))
        .map(|entry| entry.label)
        .collect();

    LabeledIncident { incident, labels }
}

/// Classifies a whole incident collection, preserving input order.
///
/// Incidents matching no category are kept (with an empty label set) and
/// reported in the log.
#[must_use]
pub fn classify_all<'a>(
    catalogue: &CategoryCatalogue,
    incidents: &'a [Incident],
) -> Vec<LabeledIncident<'a>> {
    let labeled: Vec<LabeledIncident<'a>> = incidents
        .iter()
        .map(|incident| classify(catalogue, incident))
        .collect();

    let mut unclassified = 0usize;
    for item in labeled.iter().filter(|l| l.is_unclassified()) {
        log::debug!(
            "Incident {} has no positive category measure",
            item.incident.index
        );
        unclassified += 1;
    }

    let assignments: usize = labeled.iter().map(|l| l.labels.len()).sum();
    log::info!(
        "Classified {} incidents into {assignments} category assignments ({unclassified} unclassified)",
        labeled.len()
    );

    labeled
}

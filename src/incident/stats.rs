//! Aggregate counts over an incident set.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{Incident, Severity, Status};

/// Counts derived from a specific set of incidents. Always computed fresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    pub total: usize,
    pub by_status: BTreeMap<Status, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
    /// Threats by category label.
    pub by_type: BTreeMap<String, usize>,
    /// Threats by area, the part of the location after `" - "`
    /// (`"Camera 7 - Parking Lot"` counts toward `"Parking Lot"`).
    pub by_location: BTreeMap<String, usize>,
    /// Resolved incidents over total, 0.0 for an empty set.
    pub resolution_rate: f64,
}

impl SystemStats {
    pub fn count_status(&self, status: Status) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Summarize `incidents`. Every status and severity is present in the maps,
/// zero when unseen.
pub fn summarize(incidents: &[Incident]) -> SystemStats {
    let mut by_status: BTreeMap<Status, usize> = Status::ALL.iter().map(|&s| (s, 0)).collect();
    let mut by_severity: BTreeMap<Severity, usize> =
        Severity::ALL.iter().map(|&s| (s, 0)).collect();
    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_location: BTreeMap<String, usize> = BTreeMap::new();

    for incident in incidents {
        *by_status.entry(incident.status).or_insert(0) += 1;
        *by_severity.entry(incident.severity).or_insert(0) += 1;
        *by_type.entry(incident.kind.clone()).or_insert(0) += 1;
        *by_location.entry(area(&incident.location).to_string()).or_insert(0) += 1;
    }

    let resolved = by_status.get(&Status::Resolved).copied().unwrap_or(0);
    let resolution_rate = if incidents.is_empty() {
        0.0
    } else {
        resolved as f64 / incidents.len() as f64
    };

    SystemStats {
        total: incidents.len(),
        by_status,
        by_severity,
        by_type,
        by_location,
        resolution_rate,
    }
}

fn area(location: &str) -> &str {
    match location.rsplit_once(" - ") {
        Some((_, area)) if !area.trim().is_empty() => area.trim(),
        _ => location.trim(),
    }
}

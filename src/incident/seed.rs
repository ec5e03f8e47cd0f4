//! Demo incidents that a fresh dashboard starts with.

use chrono::{DateTime, Duration, Utc};

use super::{Incident, IncidentError, IncidentStore, NewIncident, Severity, Status};

/// Three representative incidents, timestamped relative to `now`.
pub fn demo_incidents(now: DateTime<Utc>) -> Vec<NewIncident> {
    vec![
        NewIncident::new(
            "Audio Threat",
            Severity::High,
            "Camera 3 - Main Entrance",
            "Aggressive shouting detected",
            0.92,
        )
        .with_timestamp(now - Duration::minutes(5)),
        NewIncident::new(
            "Suspicious Activity",
            Severity::Medium,
            "Camera 7 - Parking Lot",
            "Unusual movement pattern detected",
            0.78,
        )
        .with_status(Status::Investigating)
        .with_timestamp(now - Duration::minutes(10)),
        NewIncident::new(
            "Intrusion Alert",
            Severity::Critical,
            "Camera 12 - Restricted Area",
            "Unauthorized access detected",
            0.95,
        )
        .with_status(Status::Resolved)
        .with_timestamp(now - Duration::minutes(15)),
    ]
}

/// Create the demo incidents in `store`.
pub async fn populate(store: &IncidentStore) -> Result<Vec<Incident>, IncidentError> {
    let mut created = Vec::new();
    for new in demo_incidents(Utc::now()) {
        created.push(store.create(new).await?);
    }
    Ok(created)
}

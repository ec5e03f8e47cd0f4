//! Threat incidents: data model, lifecycle state machine, and error taxonomy.
//!
//! The [`store::IncidentStore`] owns the canonical incident set; [`filter`]
//! and [`stats`] derive read-only views from snapshots of it.

pub mod filter;
pub mod seed;
pub mod stats;
pub mod store;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use filter::{filter, FilterCriteria, Selector};
pub use stats::{summarize, SystemStats};
pub use store::IncidentStore;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IncidentError {
    #[error("validation: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("incident {0} not found")]
    NotFound(Uuid),

    #[error("cannot {action} incident {id}: status is {from}")]
    InvalidTransition {
        id: Uuid,
        from: Status,
        action: Transition,
    },
}

impl IncidentError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable label, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Threat severity, ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = IncidentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(IncidentError::validation(
                "severity",
                format!("unrecognized severity '{}'", other),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Status + transitions
// ---------------------------------------------------------------------------

/// Lifecycle status. `Resolved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Investigating,
    Resolved,
}

/// An operator action that moves an incident through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Acknowledge,
    Resolve,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Acknowledge => "acknowledge",
            Self::Resolve => "resolve",
        })
    }
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Active, Status::Investigating, Status::Resolved];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Investigating => "investigating",
            Self::Resolved => "resolved",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Resolved
    }

    /// Target status for `action`, or `None` if the transition is not allowed.
    pub fn next(self, action: Transition) -> Option<Status> {
        match (self, action) {
            (Self::Active, Transition::Acknowledge) => Some(Self::Investigating),
            (Self::Active, Transition::Resolve) => Some(Self::Resolved),
            (Self::Investigating, Transition::Resolve) => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Status {
    type Err = IncidentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "investigating" => Ok(Self::Investigating),
            "resolved" => Ok(Self::Resolved),
            other => Err(IncidentError::validation(
                "status",
                format!("unrecognized status '{}'", other),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Incident
// ---------------------------------------------------------------------------

/// A detected threat incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub status: Status,
    pub confidence: f64,
}

/// A validated request to create an incident. `id` is always assigned by
/// the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub kind: String,
    pub severity: Severity,
    pub location: String,
    pub description: String,
    pub status: Option<Status>,
    pub confidence: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewIncident {
    pub fn new(
        kind: impl Into<String>,
        severity: Severity,
        location: impl Into<String>,
        description: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            kind: kind.into(),
            severity,
            location: location.into(),
            description: description.into(),
            status: None,
            confidence,
            timestamp: None,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Check field-level invariants that the type system cannot express.
    pub fn validate(&self) -> Result<(), IncidentError> {
        validate_confidence(self.confidence)
    }
}

/// Rejects NaN and anything outside `[0.0, 1.0]`.
pub fn validate_confidence(confidence: f64) -> Result<(), IncidentError> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(IncidentError::validation(
            "confidence",
            format!("{} is outside [0, 1]", confidence),
        ));
    }
    Ok(())
}

/// Untyped creation request, as received from the API or a detection backend.
/// Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct IncidentFields {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TryFrom<IncidentFields> for NewIncident {
    type Error = IncidentError;

    fn try_from(fields: IncidentFields) -> Result<Self, Self::Error> {
        let severity: Severity = fields.severity.parse()?;
        let status = fields
            .status
            .as_deref()
            .map(str::parse::<Status>)
            .transpose()?;
        validate_confidence(fields.confidence)?;

        Ok(Self {
            kind: fields.kind,
            severity,
            location: fields.location,
            description: fields.description,
            status,
            confidence: fields.confidence,
            timestamp: fields.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(" Investigating ".parse::<Status>().unwrap(), Status::Investigating);
    }

    #[test]
    fn unknown_severity_is_validation_error() {
        let err = "severe".parse::<Severity>().unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("severity"));
    }

    #[test]
    fn state_machine_edges() {
        assert_eq!(Status::Active.next(Transition::Acknowledge), Some(Status::Investigating));
        assert_eq!(Status::Active.next(Transition::Resolve), Some(Status::Resolved));
        assert_eq!(Status::Investigating.next(Transition::Resolve), Some(Status::Resolved));
        assert_eq!(Status::Investigating.next(Transition::Acknowledge), None);
        assert_eq!(Status::Resolved.next(Transition::Acknowledge), None);
        assert_eq!(Status::Resolved.next(Transition::Resolve), None);
        assert!(Status::Resolved.is_terminal());
    }

    #[test]
    fn confidence_bounds() {
        assert!(validate_confidence(0.0).is_ok());
        assert!(validate_confidence(1.0).is_ok());
        assert!(validate_confidence(1.5).is_err());
        assert!(validate_confidence(-0.01).is_err());
        assert!(validate_confidence(f64::NAN).is_err());
    }

    #[test]
    fn fields_convert_with_default_status() {
        let json = r#"{
            "type": "Motion Alert",
            "severity": "low",
            "location": "Camera 4 - Hallway",
            "confidence": 0.81,
            "extra": true
        }"#;
        let fields: IncidentFields = serde_json::from_str(json).unwrap();
        let new = NewIncident::try_from(fields).unwrap();
        assert_eq!(new.kind, "Motion Alert");
        assert_eq!(new.severity, Severity::Low);
        assert_eq!(new.status, None);
        assert!(new.description.is_empty());
    }

    #[test]
    fn fields_reject_unknown_status() {
        let fields = IncidentFields {
            kind: "Audio Threat".into(),
            severity: "high".into(),
            location: "Camera 1 - Entrance".into(),
            description: String::new(),
            status: Some("closed".into()),
            confidence: 0.9,
            timestamp: None,
        };
        let err = NewIncident::try_from(fields).unwrap_err();
        assert!(matches!(err, IncidentError::Validation { ref field, .. } if field == "status"));
    }

    #[test]
    fn incident_serializes_type_field() {
        let incident = Incident {
            id: Uuid::nil(),
            kind: "Intrusion Alert".into(),
            severity: Severity::Critical,
            location: "Camera 12 - Restricted Area".into(),
            timestamp: "2025-01-15T10:30:00Z".parse().unwrap(),
            description: "Unauthorized access detected".into(),
            status: Status::Resolved,
            confidence: 0.95,
        };
        let v = serde_json::to_value(&incident).unwrap();
        assert_eq!(v["type"], "Intrusion Alert");
        assert_eq!(v["severity"], "critical");
        assert_eq!(v["status"], "resolved");
        assert_eq!(v["timestamp"], "2025-01-15T10:30:00Z");
    }
}

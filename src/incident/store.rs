//! In-memory incident store: the single source of truth for incident state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Incident, IncidentError, NewIncident, Status, Transition};

/// Default size of the "live" projection.
pub const DEFAULT_LIVE_WINDOW: usize = 5;

/// Append-only incident log plus an id index into it.
#[derive(Default)]
struct Ledger {
    /// Incidents in insertion order. Never shrinks.
    incidents: Vec<Incident>,
    index: HashMap<Uuid, usize>,
}

/// Shared handle to the incident set.
///
/// Cloning is cheap and every clone sees the same incidents. Writers are
/// serialized through an `RwLock`; readers always get owned snapshots, so
/// nothing handed out can be mutated underneath a caller.
#[derive(Clone)]
pub struct IncidentStore {
    ledger: Arc<RwLock<Ledger>>,
    live_window: usize,
}

impl Default for IncidentStore {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_WINDOW)
    }
}

impl IncidentStore {
    /// Create an empty store whose live projection holds at most
    /// `live_window` active incidents.
    pub fn new(live_window: usize) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(Ledger::default())),
            live_window,
        }
    }

    pub fn live_window(&self) -> usize {
        self.live_window
    }

    /// Validate and append a new incident.
    pub async fn create(&self, new: NewIncident) -> Result<Incident, IncidentError> {
        new.validate()?;

        let mut ledger = self.ledger.write().await;

        let mut id = Uuid::new_v4();
        while ledger.index.contains_key(&id) {
            id = Uuid::new_v4();
        }

        let incident = Incident {
            id,
            kind: new.kind,
            severity: new.severity,
            location: new.location,
            timestamp: new.timestamp.unwrap_or_else(Utc::now),
            description: new.description,
            status: new.status.unwrap_or(Status::Active),
            confidence: new.confidence,
        };

        let pos = ledger.incidents.len();
        ledger.incidents.push(incident.clone());
        ledger.index.insert(id, pos);

        info!(
            incident_id = %id,
            kind = %incident.kind,
            severity = %incident.severity,
            location = %incident.location,
            "incident created"
        );
        Ok(incident)
    }

    pub async fn get(&self, id: Uuid) -> Result<Incident, IncidentError> {
        let ledger = self.ledger.read().await;
        ledger
            .index
            .get(&id)
            .map(|&pos| ledger.incidents[pos].clone())
            .ok_or(IncidentError::NotFound(id))
    }

    /// Move an active incident to `investigating`.
    pub async fn acknowledge(&self, id: Uuid) -> Result<Incident, IncidentError> {
        self.transition(id, Transition::Acknowledge).await
    }

    /// Move an active or investigating incident to `resolved`.
    pub async fn resolve(&self, id: Uuid) -> Result<Incident, IncidentError> {
        self.transition(id, Transition::Resolve).await
    }

    async fn transition(&self, id: Uuid, action: Transition) -> Result<Incident, IncidentError> {
        let mut ledger = self.ledger.write().await;
        let pos = *ledger.index.get(&id).ok_or(IncidentError::NotFound(id))?;
        let incident = &mut ledger.incidents[pos];

        let from = incident.status;
        let to = from
            .next(action)
            .ok_or(IncidentError::InvalidTransition { id, from, action })?;
        incident.status = to;

        info!(incident_id = %id, %action, %from, %to, "incident status changed");
        Ok(incident.clone())
    }

    /// Snapshot of every incident, most recent first. Incidents sharing a
    /// timestamp come out in reverse insertion order.
    pub async fn list_all(&self) -> Vec<Incident> {
        let mut snapshot: Vec<Incident> = {
            let ledger = self.ledger.read().await;
            ledger.incidents.iter().rev().cloned().collect()
        };
        // Stable sort keeps the reversed insertion order among equal timestamps.
        snapshot.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        snapshot
    }

    /// The most recent `live_window` active incidents.
    pub async fn live(&self) -> Vec<Incident> {
        let live: Vec<Incident> = self
            .list_all()
            .await
            .into_iter()
            .filter(|i| i.status == Status::Active)
            .take(self.live_window)
            .collect();
        debug!(count = live.len(), window = self.live_window, "live projection");
        live
    }

    pub async fn len(&self) -> usize {
        self.ledger.read().await.incidents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::Severity;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    fn draft(location: &str) -> NewIncident {
        NewIncident::new(
            "Audio Threat",
            Severity::High,
            location,
            "Aggressive shouting detected",
            0.92,
        )
    }

    #[tokio::test]
    async fn create_assigns_defaults() {
        let store = IncidentStore::default();
        let before = Utc::now();
        let inc = store.create(draft("Camera 3 - Main Entrance")).await.unwrap();
        assert_eq!(inc.status, Status::Active);
        assert!(inc.timestamp >= before);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(inc.id).await.unwrap(), inc);
    }

    #[tokio::test]
    async fn create_rejects_out_of_range_confidence() {
        let store = IncidentStore::default();
        let mut bad = draft("Camera 1");
        bad.confidence = 1.5;
        let err = store.create(bad).await.unwrap_err();
        assert!(matches!(err, IncidentError::Validation { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let store = IncidentStore::default();
        let mut seen = HashSet::new();
        for i in 0..200 {
            let inc = store.create(draft(&format!("Camera {}", i))).await.unwrap();
            assert!(seen.insert(inc.id));
        }
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let store = IncidentStore::default();
        let id = Uuid::new_v4();
        assert_eq!(store.get(id).await.unwrap_err(), IncidentError::NotFound(id));
        assert_eq!(store.acknowledge(id).await.unwrap_err(), IncidentError::NotFound(id));
    }

    #[tokio::test]
    async fn acknowledge_twice_fails() {
        let store = IncidentStore::default();
        let inc = store.create(draft("Camera 2")).await.unwrap();
        let acked = store.acknowledge(inc.id).await.unwrap();
        assert_eq!(acked.status, Status::Investigating);

        let err = store.acknowledge(inc.id).await.unwrap_err();
        assert_eq!(
            err,
            IncidentError::InvalidTransition {
                id: inc.id,
                from: Status::Investigating,
                action: Transition::Acknowledge,
            }
        );
        // Rejected mutation leaves state untouched.
        assert_eq!(store.get(inc.id).await.unwrap().status, Status::Investigating);
    }

    #[tokio::test]
    async fn resolved_is_terminal() {
        let store = IncidentStore::default();
        let inc = store.create(draft("Camera 5")).await.unwrap();
        assert_eq!(store.resolve(inc.id).await.unwrap().status, Status::Resolved);
        assert!(store.acknowledge(inc.id).await.is_err());
        assert!(store.resolve(inc.id).await.is_err());
    }

    #[tokio::test]
    async fn list_all_orders_by_timestamp_then_insertion() {
        let store = IncidentStore::default();
        let t0 = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();

        let old = store
            .create(draft("old").with_timestamp(t0 - Duration::minutes(10)))
            .await
            .unwrap();
        let first_tie = store.create(draft("tie-1").with_timestamp(t0)).await.unwrap();
        let second_tie = store.create(draft("tie-2").with_timestamp(t0)).await.unwrap();
        let newest = store
            .create(draft("newest").with_timestamp(t0 + Duration::minutes(1)))
            .await
            .unwrap();

        let ids: Vec<Uuid> = store.list_all().await.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![newest.id, second_tie.id, first_tie.id, old.id]);
    }

    #[tokio::test]
    async fn snapshot_is_detached_from_store() {
        let store = IncidentStore::default();
        let inc = store.create(draft("Camera 9")).await.unwrap();
        let snapshot = store.list_all().await;
        store.resolve(inc.id).await.unwrap();
        assert_eq!(snapshot[0].status, Status::Active);
    }

    #[tokio::test]
    async fn live_keeps_most_recent_active_only() {
        let store = IncidentStore::new(2);
        let t0 = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        let mut ids = Vec::new();
        for m in 0..4 {
            let inc = store
                .create(draft(&format!("Camera {}", m)).with_timestamp(t0 + Duration::minutes(m)))
                .await
                .unwrap();
            ids.push(inc.id);
        }
        store.resolve(ids[3]).await.unwrap();

        let live: Vec<Uuid> = store.live().await.into_iter().map(|i| i.id).collect();
        assert_eq!(live, vec![ids[2], ids[1]]);
        // History is untouched.
        assert_eq!(store.len().await, 4);
    }
}

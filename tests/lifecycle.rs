//! End-to-end incident lifecycle: store, filter and stats working together.

use std::collections::HashSet;
use std::time::Duration;

use vigilant::incident::{
    filter, summarize, FilterCriteria, IncidentError, IncidentFields, IncidentStore, NewIncident,
    Severity, Status, Transition,
};
use vigilant::monitor::{Monitor, SimulatedSource};

fn fields(json: &str) -> IncidentFields {
    serde_json::from_str(json).unwrap()
}

async fn demo_store() -> IncidentStore {
    let store = IncidentStore::default();
    vigilant::incident::seed::populate(&store).await.unwrap();
    store
}

#[tokio::test]
async fn confidence_above_one_is_rejected() {
    let store = IncidentStore::default();
    let raw = fields(
        r#"{"type":"Audio Threat","severity":"high","location":"Camera 1 - Entrance",
            "description":"Glass break","confidence":1.5}"#,
    );
    let err = match NewIncident::try_from(raw) {
        Ok(new) => store.create(new).await.unwrap_err(),
        Err(e) => e,
    };
    assert!(matches!(err, IncidentError::Validation { ref field, .. } if field == "confidence"));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn acknowledge_then_resolve_then_resolve_again() {
    let store = IncidentStore::default();
    let a = store
        .create(NewIncident::new(
            "Intrusion Alert",
            Severity::High,
            "Camera 12 - Restricted Area",
            "Door forced",
            0.9,
        ))
        .await
        .unwrap();
    assert_eq!(a.status, Status::Active);

    assert_eq!(store.acknowledge(a.id).await.unwrap().status, Status::Investigating);
    assert_eq!(store.resolve(a.id).await.unwrap().status, Status::Resolved);

    let err = store.resolve(a.id).await.unwrap_err();
    assert_eq!(
        err,
        IncidentError::InvalidTransition {
            id: a.id,
            from: Status::Resolved,
            action: Transition::Resolve,
        }
    );
}

#[tokio::test]
async fn search_parking_returns_parking_lot_only() {
    let store = demo_store().await;
    let all = store.list_all().await;

    let hits = filter(&all, &FilterCriteria::default().with_search("parking"));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].location, "Camera 7 - Parking Lot");
}

#[tokio::test]
async fn filter_laws_hold_on_store_snapshots() {
    let store = demo_store().await;
    for _ in 0..10 {
        store
            .create(NewIncident::new(
                "Motion Alert",
                Severity::Low,
                "Camera 4 - Hallway",
                "Real-time threat detected",
                0.8,
            ))
            .await
            .unwrap();
    }
    let all = store.list_all().await;

    let identity = FilterCriteria::parse(Some(""), Some("all"), Some("all")).unwrap();
    assert_eq!(filter(&all, &identity), all);

    let c = FilterCriteria::parse(Some("camera"), Some("low"), Some("active")).unwrap();
    let once = filter(&all, &c);
    assert_eq!(once.len(), 10);
    assert_eq!(filter(&once, &c), once);
}

#[tokio::test]
async fn stats_track_mutations() {
    let store = demo_store().await;
    let before = summarize(&store.list_all().await);
    assert_eq!(before.total, 3);
    assert_eq!(before.count_status(Status::Active), 1);

    let active = store.live().await.remove(0);
    store.acknowledge(active.id).await.unwrap();

    let after = summarize(&store.list_all().await);
    assert_eq!(after.total, 3);
    assert_eq!(after.count_status(Status::Active), 0);
    assert_eq!(after.count_status(Status::Investigating), 2);
    assert_eq!(after.by_status.values().sum::<usize>(), after.total);
}

#[tokio::test]
async fn created_ids_are_unique() {
    let store = IncidentStore::default();
    let mut ids = HashSet::new();
    for n in 0..500 {
        let inc = store
            .create(NewIncident::new(
                "Audio Threat",
                Severity::Medium,
                format!("Camera {}", n % 20),
                "",
                0.7,
            ))
            .await
            .unwrap();
        assert!(ids.insert(inc.id));
    }
}

#[tokio::test(start_paused = true)]
async fn stop_monitoring_twice_halts_the_feed() {
    let store = IncidentStore::default();
    let monitor = Monitor::new(
        store.clone(),
        Box::new(SimulatedSource::seeded(11, 1.0)),
        Duration::from_secs(5),
    );
    monitor.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(16)).await;

    assert!(monitor.stop().await.unwrap());
    let count = store.len().await;
    assert_eq!(count, 3);

    assert!(!monitor.stop().await.unwrap());
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(store.len().await, count);
}

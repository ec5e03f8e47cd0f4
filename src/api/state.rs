use crate::incident::IncidentStore;
use crate::monitor::Monitor;

#[derive(Clone)]
pub struct AppState {
    pub store: IncidentStore,
    pub monitor: Monitor,
}

impl AppState {
    /// The monitor feeds `store`, so both share one incident set.
    pub fn new(monitor: Monitor) -> Self {
        Self {
            store: monitor.store().clone(),
            monitor,
        }
    }
}

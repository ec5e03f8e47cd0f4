//! Monitoring feed: a cancellable background task that polls an
//! [`IncidentSource`] on a fixed interval and appends what it yields to the
//! [`IncidentStore`].
//!
//! `start` and `stop` are both idempotent. `stop` waits for the feed task to
//! exit, so once it returns the feed will not touch the store again.

pub mod source;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::incident::IncidentStore;

pub use self::source::{IncidentSource, SimulatedSource};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("incident source was lost when the feed task panicked")]
    SourceLost,
}

/// Feed counters, shared with the running task.
#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    created: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time view of the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub source: String,
    pub interval_ms: u64,
    pub ticks: u64,
    pub created: u64,
    /// Ticks whose incident was lost to a source error, a source panic or a
    /// validation failure.
    pub dropped: u64,
}

/// Handle to a running feed task. The task hands the source back on exit.
struct FeedTask {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<Box<dyn IncidentSource>>,
}

struct FeedSlot {
    source: Option<Box<dyn IncidentSource>>,
    task: Option<FeedTask>,
}

/// Drives an incident source into a store. Cheap to clone.
#[derive(Clone)]
pub struct Monitor {
    store: IncidentStore,
    interval: Duration,
    interval_ms: u64,
    source_name: String,
    slot: Arc<Mutex<FeedSlot>>,
    counters: Arc<Counters>,
}

impl Monitor {
    pub fn new(store: IncidentStore, source: Box<dyn IncidentSource>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            source_name: source.name().to_string(),
            slot: Arc::new(Mutex::new(FeedSlot {
                source: Some(source),
                task: None,
            })),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn store(&self) -> &IncidentStore {
        &self.store
    }

    /// Start the feed. Returns `Ok(false)` if it was already running.
    pub async fn start(&self) -> Result<bool, MonitorError> {
        let mut slot = self.slot.lock().await;
        if let Some(task) = &slot.task {
            if !task.handle.is_finished() {
                debug!("monitor already running");
                return Ok(false);
            }
        }
        // A task that exited on its own still holds the source.
        if let Some(task) = slot.task.take() {
            match task.handle.await {
                Ok(source) => slot.source = Some(source),
                Err(e) => error!(error = %e, "feed task failed"),
            }
        }
        let source = slot.source.take().ok_or(MonitorError::SourceLost)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(run_feed(
            source,
            self.store.clone(),
            self.interval,
            self.counters.clone(),
            shutdown_rx,
        ));
        slot.task = Some(FeedTask { shutdown_tx, handle });

        info!(
            source = %self.source_name,
            interval_ms = self.interval_ms,
            "monitoring started"
        );
        Ok(true)
    }

    /// Stop the feed and wait for its task to finish. Returns `Ok(false)` if
    /// it was not running.
    pub async fn stop(&self) -> Result<bool, MonitorError> {
        let mut slot = self.slot.lock().await;
        let Some(task) = slot.task.take() else {
            debug!("monitor already stopped");
            return Ok(false);
        };

        // The task may already be gone if it panicked; the join below reports it.
        let _ = task.shutdown_tx.send(());
        match task.handle.await {
            Ok(source) => {
                slot.source = Some(source);
                info!(source = %self.source_name, "monitoring stopped");
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "feed task failed");
                Err(MonitorError::SourceLost)
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        let slot = self.slot.lock().await;
        slot.task.as_ref().is_some_and(|task| !task.handle.is_finished())
    }

    pub async fn status(&self) -> MonitorStatus {
        MonitorStatus {
            running: self.is_running().await,
            source: self.source_name.clone(),
            interval_ms: self.interval_ms,
            ticks: self.counters.ticks.load(Ordering::Relaxed),
            created: self.counters.created.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

async fn run_feed(
    mut source: Box<dyn IncidentSource>,
    store: IncidentStore,
    period: Duration,
    counters: Arc<Counters>,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> Box<dyn IncidentSource> {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                break;
            }
            _ = interval.tick() => {
                tick(source.as_mut(), &store, &counters).await;
            }
        }
    }

    source
}

/// One feed tick. Failures are logged and counted, never raised.
async fn tick(source: &mut dyn IncidentSource, store: &IncidentStore, counters: &Counters) {
    counters.ticks.fetch_add(1, Ordering::Relaxed);

    let polled = AssertUnwindSafe(source.poll()).catch_unwind().await;
    let new = match polled {
        Ok(Ok(Some(new))) => new,
        Ok(Ok(None)) => return,
        Ok(Err(e)) => {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(source = source.name(), error = %e, "incident source failed, tick dropped");
            return;
        }
        Err(payload) => {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                source = source.name(),
                panic = panic_message(payload.as_ref()),
                "incident source panicked, tick dropped"
            );
            return;
        }
    };

    match store.create(new).await {
        Ok(incident) => {
            counters.created.fetch_add(1, Ordering::Relaxed);
            debug!(incident_id = %incident.id, "feed ingested incident");
        }
        Err(e) => {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(source = source.name(), error = %e, "generated incident rejected, tick dropped");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

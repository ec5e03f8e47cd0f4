//! Incident sources: anything that can yield zero or one incident per tick.

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::incident::{NewIncident, Severity};

/// A detection backend polled once per monitor tick.
///
/// Errors are per-tick: the monitor logs them and carries on.
#[async_trait]
pub trait IncidentSource: Send {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Produce at most one new incident for this tick.
    async fn poll(&mut self) -> Result<Option<NewIncident>>;
}

const THREAT_TYPES: &[&str] = &["Audio Threat", "Suspicious Activity", "Motion Alert"];
const AREAS: &[&str] = &["Entrance", "Parking", "Hallway", "Office"];
const CAMERA_COUNT: u32 = 20;

/// Random incident generator standing in for a real detection pipeline.
pub struct SimulatedSource {
    rng: StdRng,
    probability: f64,
}

impl SimulatedSource {
    /// `probability` is the per-tick chance of emitting an incident and is
    /// clamped to `[0, 1]`.
    pub fn new(probability: f64) -> Self {
        Self::with_rng(StdRng::from_entropy(), probability)
    }

    /// Deterministic generator for reproducible runs.
    pub fn seeded(seed: u64, probability: f64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), probability)
    }

    fn with_rng(rng: StdRng, probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self { rng, probability }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    fn sample(&mut self) -> NewIncident {
        let kind = THREAT_TYPES.choose(&mut self.rng).copied().unwrap_or("Motion Alert");
        let severity = Severity::ALL
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(Severity::Low);
        let camera = self.rng.gen_range(1..=CAMERA_COUNT);
        let area = AREAS.choose(&mut self.rng).copied().unwrap_or("Entrance");
        let confidence = self.rng.gen_range(0.7..=1.0);

        NewIncident::new(
            kind,
            severity,
            format!("Camera {} - {}", camera, area),
            "Real-time threat detected",
            confidence,
        )
    }
}

#[async_trait]
impl IncidentSource for SimulatedSource {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn poll(&mut self) -> Result<Option<NewIncident>> {
        if self.rng.gen_bool(self.probability) {
            Ok(Some(self.sample()))
        } else {
            Ok(None)
        }
    }
}

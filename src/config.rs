//! TOML configuration for the Vigilant service.
//!
//! Layered model: compiled-in defaults, optionally overridden by a file
//! given on the command line, via `VIGILANT_CONFIG`, or at the standard
//! system location.

use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "VIGILANT_CONFIG";

const SYSTEM_CONFIG_PATH: &str = "/etc/vigilant/vigilant.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VigilantConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VigilantConfig {
    /// Load and validate configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try, in order: `VIGILANT_CONFIG`, `/etc/vigilant/vigilant.toml`,
    /// compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "VIGILANT_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    /// Load from `path` if given, otherwise fall back to [`load_or_default`].
    ///
    /// [`load_or_default`]: Self::load_or_default
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::load_or_default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.monitor.validate()
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize configuration")
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the HTTP API.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Simulated ingestion feed settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Milliseconds between feed ticks.
    pub tick_interval_ms: u64,
    /// Chance, per tick, that the simulated source emits an incident.
    pub incident_probability: f64,
    /// Number of active incidents in the live projection.
    pub live_window: usize,
    /// Start the feed when the server starts.
    pub autostart: bool,
    /// Fixed RNG seed for reproducible feeds.
    pub seed: Option<u64>,
    /// Create the demo incidents on startup.
    pub seed_demo_incidents: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5_000,
            incident_probability: 0.1,
            live_window: 5,
            autostart: true,
            seed: None,
            seed_demo_incidents: true,
        }
    }
}

impl MonitorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.tick_interval_ms > 0, "monitor.tick_interval_ms must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.incident_probability),
            "monitor.incident_probability must be within [0, 1], got {}",
            self.incident_probability
        );
        ensure!(self.live_window > 0, "monitor.live_window must be positive");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

//! Application configuration, read from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derelict_core::constants::EVENT_LOG_CAPACITY;
use derelict_sim::SimConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Driver settings. Every field has a default, so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seed for a new ship.
    pub seed: u64,
    /// Wall-clock time between auto ticks.
    pub tick_interval_ms: u64,
    /// Simulated seconds advanced by each auto tick.
    pub seconds_per_tick: f64,
    /// Simulated seconds run under one lock during hibernation.
    pub hibernate_chunk_s: u64,
    pub save_dir: PathBuf,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_interval_ms: 1000,
            seconds_per_tick: 1.0,
            hibernate_chunk_s: 60,
            save_dir: PathBuf::from("saves"),
            log_filter: "info".into(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.seconds_per_tick > 0.0) || !self.seconds_per_tick.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "seconds_per_tick must be positive, got {}",
                self.seconds_per_tick
            )));
        }
        if self.hibernate_chunk_s == 0 {
            return Err(ConfigError::Invalid("hibernate_chunk_s must be at least 1".into()));
        }
        Ok(())
    }

    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            seed: self.seed,
            event_capacity: EVENT_LOG_CAPACITY,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

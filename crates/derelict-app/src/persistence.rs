//! Slot-based save files. Each slot is one pretty-printed JSON file holding
//! the complete ship aggregate.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use derelict_core::state::SimState;
use derelict_core::types::NodeId;
use derelict_sim::scenario;
use derelict_sim::SimulationEngine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Full save data written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    pub slot_name: String,
    /// Wall-clock seconds since the Unix epoch.
    pub timestamp: u64,
    pub state: SimState,
}

/// Lightweight metadata for listing saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub slot_name: String,
    pub timestamp: u64,
    pub elapsed_s: f64,
    pub node: NodeId,
    pub terminal_lock: bool,
}

impl SaveData {
    /// Snapshot an engine into a save slot.
    pub fn capture(slot: &str, engine: &SimulationEngine) -> Self {
        Self {
            slot_name: slot.to_string(),
            timestamp: unix_now(),
            state: engine.state().clone(),
        }
    }

    /// Resume the saved ship with the built-in catalog.
    pub fn into_engine(self) -> SimulationEngine {
        SimulationEngine::from_state(self.state, scenario::default_catalog())
    }

    fn metadata(&self) -> SaveMetadata {
        SaveMetadata {
            slot_name: self.slot_name.clone(),
            timestamp: self.timestamp,
            elapsed_s: self.state.clock.elapsed_s,
            node: self.state.nav.current_node.clone(),
            terminal_lock: self.state.terminal_lock,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn save_path(dir: &Path, slot: &str) -> PathBuf {
    dir.join(format!("{slot}.json"))
}

pub fn save_to_file(dir: &Path, slot: &str, data: &SaveData) -> Result<(), PersistError> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(data)?;
    fs::write(save_path(dir, slot), json)?;
    info!(slot, "game saved");
    Ok(())
}

pub fn load_from_file(dir: &Path, slot: &str) -> Result<SaveData, PersistError> {
    let json = fs::read_to_string(save_path(dir, slot))?;
    Ok(serde_json::from_str(&json)?)
}

/// Every readable save in `dir`, newest first. Unreadable files are skipped.
pub fn list_saves(dir: &Path) -> Vec<SaveMetadata> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut saves = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "json") {
            continue;
        }
        let parsed = fs::read_to_string(&path)
            .map_err(PersistError::from)
            .and_then(|json| Ok(serde_json::from_str::<SaveData>(&json)?));
        match parsed {
            Ok(data) => saves.push(data.metadata()),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable save"),
        }
    }
    saves.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    saves
}

/// Remove a slot. Deleting a missing slot is not an error.
pub fn delete_save(dir: &Path, slot: &str) -> Result<(), PersistError> {
    let path = save_path(dir, slot);
    if path.exists() {
        fs::remove_file(&path)?;
    }
    Ok(())
}

//! Read-only lookup tables supplied by external collaborators.
//!
//! The engine never mutates a catalog; per-save mutable facts (scrap already
//! salvaged from a node, installed modules) live in the aggregate instead.

use std::collections::BTreeMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::enums::{NodeKind, SystemId};
use crate::types::{ModuleId, NodeId};

/// What installing a module does to the ship.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleEffect {
    /// Added generation capacity (kW).
    #[serde(default)]
    pub generation_kw: f64,
    /// Added battery capacity (kWh).
    #[serde(default)]
    pub battery_capacity_kwh: f64,
    /// Additive power-quality offset.
    #[serde(default)]
    pub quality_offset: f64,
    /// Subsystem lifted to UPGRADED while NOMINAL.
    #[serde(default)]
    pub upgrades: Option<SystemId>,
    /// Opaque unlock flags for collaborators.
    #[serde(default)]
    pub unlocks: Vec<String>,
}

/// Module catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDef {
    pub id: ModuleId,
    pub name: String,
    pub scrap_cost: u32,
    /// Install job duration (seconds).
    pub install_s: f64,
    pub effect: ModuleEffect,
}

/// World-graph node entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub position: DVec2,
    /// Ambient radiation level; normalized by `RADIATION_NORM`.
    pub radiation: f64,
    /// Total scrap recoverable by salvage runs.
    pub salvage_scrap: u32,
}

/// All external lookup tables the engine consults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub modules: BTreeMap<ModuleId, ModuleDef>,
    pub nodes: BTreeMap<NodeId, NodeDef>,
    /// Ship sectors drones can be sent to.
    pub sectors: Vec<String>,
}

impl Catalog {
    pub fn module(&self, id: &ModuleId) -> Option<&ModuleDef> {
        self.modules.get(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeDef> {
        self.nodes.get(id)
    }

    pub fn has_sector(&self, name: &str) -> bool {
        self.sectors.iter().any(|s| s == name)
    }

    /// Straight-line distance between two known nodes.
    pub fn distance(&self, a: &NodeId, b: &NodeId) -> Option<f64> {
        let a = self.nodes.get(a)?;
        let b = self.nodes.get(b)?;
        Some(a.position.distance(b.position))
    }

    /// Radiation at a node; unknown nodes count as clean space.
    pub fn radiation_at(&self, id: &NodeId) -> f64 {
        self.nodes.get(id).map(|n| n.radiation).unwrap_or(0.0)
    }

    pub fn add_module(&mut self, def: ModuleDef) {
        self.modules.insert(def.id.clone(), def);
    }

    pub fn add_node(&mut self, def: NodeDef) {
        self.nodes.insert(def.id.clone(), def);
    }
}

//! Ship components: subsystems, the power network, drones, inventory, navigation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::{DroneStatus, PowerMode, SystemId, SystemState};
use crate::types::{DroneId, Location, ModuleId, NodeId};

/// "`target` must be at least `min_state`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub target: SystemId,
    pub min_state: SystemState,
}

impl Dependency {
    pub fn new(target: SystemId, min_state: SystemState) -> Self {
        Self { target, min_state }
    }
}

/// Software service hosted by a subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub installed: bool,
    pub running: bool,
    /// Boot job duration (seconds).
    pub boot_s: f64,
}

/// A named ship component with continuous health and a derived discrete state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsystem {
    pub id: SystemId,
    /// Continuous health in [0, 1].
    pub health: f64,
    pub state: SystemState,
    /// Nominal draw when powered (kW).
    pub draw_kw: f64,
    /// Load-shed priority: higher numbers go first, 1 is never shed.
    pub priority: u8,
    /// Health lost per second before modifiers.
    pub base_decay: f64,
    /// Weight of normalized radiation in the decay formula.
    pub env_sensitivity: f64,
    pub dependencies: Vec<Dependency>,
    pub service: Option<Service>,
    /// Freezes `state` against health-driven transitions.
    #[serde(default)]
    pub state_locked: bool,
    /// Manual or automatic shed; always forces OFFLINE.
    #[serde(default)]
    pub forced_offline: bool,
    /// Set by an installed module; lifts NOMINAL to UPGRADED.
    #[serde(default)]
    pub upgraded: bool,
}

impl Subsystem {
    pub fn is_critical(&self) -> bool {
        self.priority <= CRITICAL_PRIORITY
    }

    pub fn is_powered(&self) -> bool {
        self.state.is_online()
    }

    pub fn service_running(&self) -> bool {
        self.service.as_ref().is_some_and(|s| s.running)
    }
}

/// Ship power network: generation, load, battery and the derived quality figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerNetwork {
    pub base_generation_kw: f64,
    /// Sum of installed module generation bonuses (kW).
    pub bonus_generation_kw: f64,
    /// Generation after power-core scaling, recomputed each tick (kW).
    pub generation_kw: f64,
    /// Instantaneous load, recomputed each tick (kW).
    pub load_kw: f64,
    pub battery_kwh: f64,
    pub capacity_kwh: f64,
    pub charge_efficiency: f64,
    pub discharge_efficiency: f64,
    pub max_charge_kw: f64,
    pub max_discharge_kw: f64,
    /// Battery discharge the bus could draw this tick (kW).
    pub available_discharge_kw: f64,
    pub soc: f64,
    /// Derived quality in [0, 1].
    pub quality: f64,
    /// Shortfall of generation against load, over max discharge, clamped to [0, 1].
    pub deficit_ratio: f64,
    /// Module-granted additive quality offset.
    pub quality_offset: f64,
    pub mode: PowerMode,
    pub brownout: bool,
    /// How long the current brownout has lasted (seconds).
    pub brownout_s: f64,
    /// Time spent below the critical quality threshold since the last shed (seconds).
    pub low_quality_s: f64,
}

impl PowerNetwork {
    pub fn fresh() -> Self {
        Self {
            base_generation_kw: BASE_GENERATION_KW,
            bonus_generation_kw: 0.0,
            generation_kw: 0.0,
            load_kw: 0.0,
            battery_kwh: BATTERY_INITIAL_KWH,
            capacity_kwh: BATTERY_CAPACITY_KWH,
            charge_efficiency: CHARGE_EFFICIENCY,
            discharge_efficiency: DISCHARGE_EFFICIENCY,
            max_charge_kw: MAX_CHARGE_KW,
            max_discharge_kw: MAX_DISCHARGE_KW,
            available_discharge_kw: 0.0,
            soc: BATTERY_INITIAL_KWH / BATTERY_CAPACITY_KWH,
            quality: 1.0,
            deficit_ratio: 0.0,
            quality_offset: 0.0,
            mode: PowerMode::Normal,
            brownout: false,
            brownout_s: 0.0,
            low_quality_s: 0.0,
        }
    }

    /// Generation minus load (kW); negative when running on battery.
    pub fn net_kw(&self) -> f64 {
        self.generation_kw - self.load_kw
    }

    pub fn state_of_charge(&self) -> f64 {
        if self.capacity_kwh <= 0.0 {
            0.0
        } else {
            (self.battery_kwh / self.capacity_kwh).clamp(0.0, 1.0)
        }
    }

    /// Brownout has lasted long enough to wear power hardware.
    pub fn brownout_sustained(&self) -> bool {
        self.brownout && self.brownout_s >= BROWNOUT_SUSTAIN_S
    }
}

/// A maintenance drone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    pub id: DroneId,
    pub status: DroneStatus,
    pub location: Location,
    /// Battery in [0, 1].
    pub battery: f64,
    /// Integrity in [0, 1].
    pub integrity: f64,
    /// Accumulated radiation dose.
    pub radiation_dose: f64,
    /// Low-battery warning already emitted for the current discharge.
    pub low_battery_warned: bool,
    /// Docked time accumulated toward the next passive repair step (seconds).
    #[serde(default)]
    pub repair_progress_s: f64,
}

impl Drone {
    pub fn docked(id: DroneId, battery: f64, integrity: f64) -> Self {
        Self {
            id,
            status: DroneStatus::Docked,
            location: Location::sector(DRONE_BAY_SECTOR),
            battery,
            integrity,
            radiation_dose: 0.0,
            low_battery_warned: false,
            repair_progress_s: 0.0,
        }
    }

    /// Able to take on work (not disabled or lost).
    pub fn is_operational(&self) -> bool {
        matches!(self.status, DroneStatus::Docked | DroneStatus::Deployed)
    }
}

/// Ship stores and installed hardware.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub scrap: u32,
    pub installed_modules: Vec<ModuleId>,
}

/// Where the ship is in the world graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    pub current_node: NodeId,
    pub in_transit: bool,
    /// Destination while in transit.
    pub destination: Option<NodeId>,
    /// Nodes a route has been solved to from anywhere.
    pub known_routes: BTreeSet<NodeId>,
    /// Scrap already taken per node.
    pub salvaged: BTreeMap<NodeId, u32>,
}

impl Navigation {
    pub fn at(node: NodeId) -> Self {
        Self {
            current_node: node,
            in_transit: false,
            destination: None,
            known_routes: BTreeSet::new(),
            salvaged: BTreeMap::new(),
        }
    }

    /// Ship is parked at `node`.
    pub fn is_at(&self, node: &NodeId) -> bool {
        !self.in_transit && &self.current_node == node
    }
}

//! Scenario definitions: the fresh derelict and the default world catalog.
//!
//! The fresh ship starts damaged. The power core runs at 60%, security is
//! barely holding, and two maintenance drones sit in the bay with 20 scrap
//! to work with.

use std::collections::BTreeMap;

use glam::DVec2;

use derelict_core::catalog::{Catalog, ModuleDef, ModuleEffect, NodeDef};
use derelict_core::components::{
    Dependency, Drone, Inventory, Navigation, PowerNetwork, Service, Subsystem,
};
use derelict_core::constants::{DRONE_BAY_SECTOR, EVENT_LOG_CAPACITY};
use derelict_core::enums::{NodeKind, SystemId, SystemState};
use derelict_core::events::EventLog;
use derelict_core::state::SimState;
use derelict_core::types::{DroneId, ModuleId, NodeId, SimClock};

use crate::systems::{alerts, power, subsystems};

/// Node the fresh ship is parked at.
pub const START_NODE: &str = "wreck_field";

/// Scrap in the hold at the start.
pub const START_SCRAP: u32 = 20;

struct SubsystemSpec {
    id: SystemId,
    health: f64,
    draw_kw: f64,
    priority: u8,
    base_decay: f64,
    env_sensitivity: f64,
    deps: &'static [(SystemId, SystemState)],
    service: Option<(&'static str, bool, f64)>,
}

const FRESH_SUBSYSTEMS: &[SubsystemSpec] = &[
    SubsystemSpec {
        id: SystemId::PowerCore,
        health: 0.60,
        draw_kw: 0.5,
        priority: 1,
        base_decay: 1.5e-5,
        env_sensitivity: 0.3,
        deps: &[],
        service: None,
    },
    SubsystemSpec {
        id: SystemId::EnergyDistribution,
        health: 0.70,
        draw_kw: 0.4,
        priority: 1,
        base_decay: 1.5e-5,
        env_sensitivity: 0.2,
        deps: &[(SystemId::PowerCore, SystemState::Critical)],
        service: None,
    },
    SubsystemSpec {
        id: SystemId::LifeSupport,
        health: 0.90,
        draw_kw: 1.5,
        priority: 1,
        base_decay: 1.0e-5,
        env_sensitivity: 0.2,
        deps: &[(SystemId::EnergyDistribution, SystemState::Critical)],
        service: None,
    },
    SubsystemSpec {
        id: SystemId::DataCore,
        health: 0.80,
        draw_kw: 1.0,
        priority: 2,
        base_decay: 1.2e-5,
        env_sensitivity: 0.5,
        deps: &[(SystemId::EnergyDistribution, SystemState::Damaged)],
        service: Some(("core_os", true, 60.0)),
    },
    SubsystemSpec {
        id: SystemId::Sensors,
        health: 0.75,
        draw_kw: 1.2,
        priority: 3,
        base_decay: 2.0e-5,
        env_sensitivity: 0.8,
        deps: &[
            (SystemId::DataCore, SystemState::Damaged),
            (SystemId::EnergyDistribution, SystemState::Damaged),
        ],
        service: Some(("sensord", false, 45.0)),
    },
    SubsystemSpec {
        id: SystemId::DroneBay,
        health: 0.70,
        draw_kw: 0.8,
        priority: 3,
        base_decay: 1.5e-5,
        env_sensitivity: 0.3,
        deps: &[(SystemId::EnergyDistribution, SystemState::Damaged)],
        service: Some(("droned", true, 30.0)),
    },
    SubsystemSpec {
        id: SystemId::Security,
        health: 0.50,
        draw_kw: 0.6,
        priority: 4,
        base_decay: 1.2e-5,
        env_sensitivity: 0.4,
        deps: &[(SystemId::DataCore, SystemState::Limited)],
        service: Some(("secmon", false, 40.0)),
    },
];

fn build_subsystem(spec: &SubsystemSpec) -> Subsystem {
    let mut sys = Subsystem {
        id: spec.id,
        health: spec.health,
        state: SystemState::Offline,
        draw_kw: spec.draw_kw,
        priority: spec.priority,
        base_decay: spec.base_decay,
        env_sensitivity: spec.env_sensitivity,
        dependencies: spec
            .deps
            .iter()
            .map(|&(target, min_state)| Dependency::new(target, min_state))
            .collect(),
        service: spec.service.map(|(name, running, boot_s)| Service {
            name: name.to_string(),
            installed: true,
            running,
            boot_s,
        }),
        state_locked: false,
        forced_offline: false,
        upgraded: false,
    };
    sys.state = subsystems::derive_state(&sys);
    sys
}

/// The derelict as the player finds it.
///
/// Power figures and the initial alert table are computed before return,
/// so the `alert_raised` events for starting conditions sit in the event
/// log's recent buffer.
pub fn fresh_state(seed: u64, event_capacity: usize) -> SimState {
    let systems: BTreeMap<SystemId, Subsystem> = FRESH_SUBSYSTEMS
        .iter()
        .map(|spec| (spec.id, build_subsystem(spec)))
        .collect();

    let drones: BTreeMap<DroneId, Drone> = [
        Drone::docked(DroneId(1), 0.8, 1.0),
        Drone::docked(DroneId(2), 0.55, 0.7),
    ]
    .into_iter()
    .map(|d| (d.id, d))
    .collect();

    let mut state = SimState {
        seed,
        clock: SimClock::default(),
        power: PowerNetwork::fresh(),
        systems,
        jobs: Vec::new(),
        next_job_id: 1,
        drones,
        alerts: BTreeMap::new(),
        events: EventLog::new(event_capacity),
        inventory: Inventory {
            scrap: START_SCRAP,
            installed_modules: Vec::new(),
        },
        nav: Navigation::at(NodeId::new(START_NODE)),
        terminal_lock: false,
        bus_instability_s: 0.0,
        unacked_carry_s: 0.0,
    };

    power::refresh(&mut state);
    alerts::reconcile(&mut state);
    state
}

/// `fresh_state` with the default event capacity.
pub fn fresh_ship(seed: u64) -> SimState {
    fresh_state(seed, EVENT_LOG_CAPACITY)
}

fn node(id: &str, name: &str, kind: NodeKind, x: f64, y: f64, radiation: f64, salvage: u32) -> NodeDef {
    NodeDef {
        id: NodeId::new(id),
        name: name.to_string(),
        kind,
        position: DVec2::new(x, y),
        radiation,
        salvage_scrap: salvage,
    }
}

fn module(id: &str, name: &str, scrap_cost: u32, install_s: f64, effect: ModuleEffect) -> ModuleDef {
    ModuleDef {
        id: ModuleId::new(id),
        name: name.to_string(),
        scrap_cost,
        install_s,
        effect,
    }
}

/// World nodes, installable modules and ship sectors.
pub fn default_catalog() -> Catalog {
    let mut catalog = Catalog {
        sectors: [DRONE_BAY_SECTOR, "hull", "engineering", "cargo", "reactor"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        ..Default::default()
    };

    // Distances are in map units; sensor range at NOMINAL is 40.
    catalog.add_node(node(START_NODE, "Wreck Field", NodeKind::Wreck, 0.0, 0.0, 2.0, 30));
    catalog.add_node(node("relay_station", "Dead Relay", NodeKind::Station, 25.0, 10.0, 0.5, 10));
    catalog.add_node(node("ice_belt", "Ice Belt", NodeKind::Asteroid, -30.0, 20.0, 1.0, 15));
    catalog.add_node(node("ion_veil", "Ion Veil", NodeKind::Nebula, 60.0, -15.0, 9.0, 40));
    catalog.add_node(node("far_beacon", "Far Beacon", NodeKind::Void, 120.0, 40.0, 0.2, 0));

    catalog.add_module(module(
        "fusion_baffle",
        "Fusion Baffle",
        12,
        120.0,
        ModuleEffect {
            generation_kw: 2.0,
            upgrades: Some(SystemId::PowerCore),
            ..Default::default()
        },
    ));
    catalog.add_module(module(
        "capacitor_bank",
        "Capacitor Bank",
        8,
        90.0,
        ModuleEffect {
            battery_capacity_kwh: 6.0,
            ..Default::default()
        },
    ));
    catalog.add_module(module(
        "bus_regulator",
        "Bus Regulator",
        10,
        100.0,
        ModuleEffect {
            quality_offset: 0.05,
            upgrades: Some(SystemId::EnergyDistribution),
            ..Default::default()
        },
    ));
    catalog.add_module(module(
        "sensor_array",
        "Long-Baseline Sensor Array",
        15,
        150.0,
        ModuleEffect {
            upgrades: Some(SystemId::Sensors),
            unlocks: vec!["deep_scan".to_string()],
            ..Default::default()
        },
    ));

    catalog
}

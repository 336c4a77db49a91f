//! Drone maintenance: battery drain and charging, passive bay repair,
//! radiation exposure and low-battery warnings.

use derelict_core::catalog::Catalog;
use derelict_core::components::Drone;
use derelict_core::constants::*;
use derelict_core::enums::{DroneStatus, Severity, SystemId, SystemState};
use derelict_core::events::{Event, EventData, EventKind};
use derelict_core::state::SimState;
use derelict_core::types::{Location, Source};
use tracing::warn;

use crate::rng::{self, RollStream};

/// Charge-rate multiplier for the drone bay state.
pub fn bay_charge_factor(state: SystemState) -> f64 {
    match state {
        SystemState::Nominal | SystemState::Upgraded => 1.0,
        SystemState::Limited | SystemState::Damaged => 0.5,
        SystemState::Critical => 0.25,
        SystemState::Offline => 0.0,
    }
}

/// Passive integrity repair per second of docked time for the bay state.
pub fn bay_repair_rate(state: SystemState) -> f64 {
    match state {
        SystemState::Nominal | SystemState::Upgraded => 0.002,
        SystemState::Limited => 0.0015,
        SystemState::Damaged => 0.001,
        SystemState::Critical => 0.0005,
        SystemState::Offline => 0.0,
    }
}

fn system_state(state: &SimState, id: SystemId) -> SystemState {
    state.system(id).map_or(SystemState::Offline, |s| s.state)
}

/// Per-second charge rate currently available to docked drones.
pub fn charge_rate(state: &SimState) -> f64 {
    if system_state(state, SystemId::EnergyDistribution) == SystemState::Offline {
        return 0.0;
    }
    let net = state.power.net_kw();
    let base = if net >= DRONE_CHARGE_DRAW_KW {
        DRONE_CHARGE_PER_S
    } else if net >= DRONE_CHARGE_NET_FLOOR_KW {
        DRONE_CHARGE_REDUCED_PER_S
    } else {
        0.0
    };
    base * bay_charge_factor(system_state(state, SystemId::DroneBay))
}

fn drone_data(drone: &Drone) -> EventData {
    EventData::Drone {
        drone: drone.id,
        battery: drone.battery,
        integrity: drone.integrity,
    }
}

/// One maintenance step over every drone.
pub fn run(state: &mut SimState, catalog: &Catalog, dt: f64) {
    let t = state.now();
    let seed = state.seed;
    let tick = state.clock.tick;
    let charge = charge_rate(state);
    let bay = system_state(state, SystemId::DroneBay);
    let repair_available = bay != SystemState::Offline
        && system_state(state, SystemId::EnergyDistribution) != SystemState::Offline;

    for drone in state.drones.values_mut() {
        match drone.status {
            DroneStatus::Deployed => {
                drone.battery = (drone.battery - DRONE_DRAIN_PER_S * dt).max(0.0);
                if let Location::Node(node) = &drone.location {
                    let radiation = catalog.radiation_at(node);
                    drone.radiation_dose += radiation * dt;
                    let wear = DRONE_RADIATION_WEAR_PER_S * (radiation / RADIATION_NORM) * dt;
                    drone.integrity = (drone.integrity - wear).max(0.0);
                }
            }
            DroneStatus::Docked => {
                drone.battery = (drone.battery + charge * dt).min(1.0);

                if drone.integrity >= 1.0 || !repair_available {
                    drone.repair_progress_s = 0.0;
                } else {
                    drone.repair_progress_s += dt;
                    let mut step = 0u64;
                    while drone.repair_progress_s >= DRONE_REPAIR_INTERVAL_S && drone.integrity < 1.0 {
                        if state.inventory.scrap < DRONE_REPAIR_SCRAP_COST {
                            drone.repair_progress_s = DRONE_REPAIR_INTERVAL_S;
                            break;
                        }
                        drone.repair_progress_s -= DRONE_REPAIR_INTERVAL_S;
                        state.inventory.scrap -= DRONE_REPAIR_SCRAP_COST;

                        let mishap = bay == SystemState::Critical
                            && rng::chance(
                                DRONE_REPAIR_MISHAP_P,
                                seed,
                                RollStream::DroneRepair,
                                u64::from(drone.id.0),
                                tick.wrapping_mul(1024).wrapping_add(step),
                            );
                        step += 1;

                        if mishap {
                            drone.integrity = (drone.integrity - DRONE_REPAIR_MISHAP_DAMAGE).max(0.0);
                            state.events.push(
                                t,
                                Event::new(
                                    EventKind::DroneRepairMishap,
                                    Severity::Warning,
                                    Source::Drone(drone.id),
                                    format!("Bay repair damaged {}", drone.id),
                                )
                                .with_data(drone_data(drone)),
                            );
                        } else {
                            drone.integrity = (drone.integrity
                                + bay_repair_rate(bay) * DRONE_REPAIR_INTERVAL_S)
                                .min(1.0);
                        }
                    }
                }
            }
            DroneStatus::Disabled | DroneStatus::Lost => continue,
        }

        if drone.battery <= DRONE_LOW_BATTERY {
            if !drone.low_battery_warned {
                drone.low_battery_warned = true;
                state.events.push(
                    t,
                    Event::new(
                        EventKind::DroneLowBattery,
                        Severity::Warning,
                        Source::Drone(drone.id),
                        format!("{} battery low ({:.0}%)", drone.id, drone.battery * 100.0),
                    )
                    .with_data(drone_data(drone)),
                );
            }
        } else {
            drone.low_battery_warned = false;
        }

        if drone.status == DroneStatus::Deployed && drone.battery <= 0.0 {
            drone.status = DroneStatus::Disabled;
            warn!(drone = %drone.id, "drone battery depleted");
            state.events.push(
                t,
                Event::new(
                    EventKind::DroneDisabled,
                    Severity::Critical,
                    Source::Drone(drone.id),
                    format!("{} disabled: battery depleted", drone.id),
                )
                .with_data(drone_data(drone)),
            );
        }
    }
}

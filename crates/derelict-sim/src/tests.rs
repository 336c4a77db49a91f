//! Tests for the simulation engine, power network, job scheduler, drones and alerts.

use std::sync::{Arc, Mutex};

use derelict_core::commands::Action;
use derelict_core::enums::*;
use derelict_core::events::{BlockDetail, BlockReason, Event, EventData, EventKind};
use derelict_core::jobs::RiskProfile;
use derelict_core::types::{DroneId, JobId, Location, ModuleId, NodeId};

use crate::engine::{SimConfig, SimulationEngine};
use crate::scenario;

const D1: DroneId = DroneId(1);
const D2: DroneId = DroneId(2);

fn engine() -> SimulationEngine {
    SimulationEngine::new(SimConfig::default())
}

/// Tick `seconds` one-second steps, collecting every event.
fn run(engine: &mut SimulationEngine, seconds: u32) -> Vec<Event> {
    (0..seconds).flat_map(|_| engine.tick(1.0)).collect()
}

fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

/// The single blocked event's reason.
fn blocked(events: &[Event]) -> BlockReason {
    assert_eq!(events.len(), 1, "expected one blocked event, got {events:?}");
    events[0]
        .block_reason()
        .unwrap_or_else(|| panic!("not a blocked event: {:?}", events[0]))
}

fn accepted(events: &[Event]) {
    assert!(
        events.iter().all(|e| e.kind != EventKind::ActionBlocked),
        "action was blocked: {events:?}"
    );
}

/// Drone 2 starts damaged and the bay spends scrap repairing it; make it
/// whole so scrap only moves when a test says so.
fn settle_bay(engine: &mut SimulationEngine) {
    engine.state_mut().drones.get_mut(&D2).unwrap().integrity = 1.0;
}

fn state_json(engine: &SimulationEngine) -> String {
    serde_json::to_string(engine.state()).unwrap()
}

// ---- Determinism ----

fn scripted(engine: &mut SimulationEngine, tick: u32) -> Vec<Event> {
    let mut events = Vec::new();
    match tick {
        1 => events.extend(engine.apply_action(&Action::RepairSystem {
            system: SystemId::PowerCore,
            drone: D1,
        })),
        5 => events.extend(engine.apply_action(&Action::ShedSystem {
            system: SystemId::DroneBay,
        })),
        6 => events.extend(engine.apply_action(&Action::DeployDrone {
            drone: D2,
            destination: Location::Node(NodeId::new("wreck_field")),
            emergency: true,
        })),
        40 => events.extend(engine.apply_action(&Action::SolveRoute {
            to: NodeId::new("relay_station"),
        })),
        _ => {}
    }
    events.extend(engine.tick(1.0));
    events
}

#[test]
fn test_determinism_same_seed() {
    let mut engine_a = SimulationEngine::new(SimConfig {
        seed: 12345,
        ..Default::default()
    });
    let mut engine_b = SimulationEngine::new(SimConfig {
        seed: 12345,
        ..Default::default()
    });

    for tick in 0..300 {
        let json_a = serde_json::to_string(&scripted(&mut engine_a, tick)).unwrap();
        let json_b = serde_json::to_string(&scripted(&mut engine_b, tick)).unwrap();
        assert_eq!(json_a, json_b, "Events diverged with same seed at tick {tick}");
    }
    assert_eq!(state_json(&engine_a), state_json(&engine_b));
}

#[test]
fn test_tick_zero_is_noop() {
    let mut engine = engine();
    run(&mut engine, 3);
    let before = state_json(&engine);

    assert!(engine.tick(0.0).is_empty());
    assert!(engine.tick(-5.0).is_empty());
    assert!(engine.tick(f64::NAN).is_empty());

    assert_eq!(before, state_json(&engine));
}

#[test]
fn test_round_trip_reproduces_outputs() {
    let mut engine_a = engine();
    for tick in 0..50 {
        scripted(&mut engine_a, tick);
    }

    let json = state_json(&engine_a);
    let restored = serde_json::from_str(&json).unwrap();
    let mut engine_b = SimulationEngine::from_state(restored, scenario::default_catalog());
    assert_eq!(json, state_json(&engine_b));

    for tick in 50..250 {
        let out_a = serde_json::to_string(&scripted(&mut engine_a, tick)).unwrap();
        let out_b = serde_json::to_string(&scripted(&mut engine_b, tick)).unwrap();
        assert_eq!(out_a, out_b, "Restored engine diverged at tick {tick}");
    }
}

// ---- Fresh ship ----

#[test]
fn test_fresh_ship() {
    let engine = engine();
    let state = engine.state();

    let core = state.system(SystemId::PowerCore).unwrap();
    assert!((core.health - 0.6).abs() < 1e-12);
    assert_eq!(core.state, SystemState::Damaged);
    assert_eq!(state.system(SystemId::LifeSupport).unwrap().state, SystemState::Nominal);
    assert_eq!(state.system(SystemId::Security).unwrap().state, SystemState::Damaged);

    assert!(state.alert_active(AlertKey::PowerCoreDegraded));
    assert_eq!(state.alerts.values().filter(|a| a.active).count(), 1);
    assert!(state
        .events
        .recent()
        .any(|e| e.kind == EventKind::AlertRaised));

    assert_eq!(state.inventory.scrap, 20);
    assert_eq!(state.nav.current_node, NodeId::new("wreck_field"));
    assert_eq!(state.drones.len(), 2);
    assert!(state.drones.values().all(|d| d.status == DroneStatus::Docked));
    assert!(!state.terminal_lock);
}

#[test]
fn test_startup_alerts_not_returned_by_first_tick() {
    let mut engine = engine();
    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::AlertRaised), 0);
}

// ---- Power ----

#[test]
fn test_fresh_power_balance() {
    let mut engine = engine();
    let events = engine.tick(1.0);
    let power = &engine.state().power;

    assert!((power.generation_kw - 6.6).abs() < 1e-9);
    assert!((power.load_kw - 6.0).abs() < 1e-9);
    assert!(!power.brownout);
    assert!((power.quality - 0.95).abs() < 1e-9);
    assert_eq!(count(&events, EventKind::SystemStateChanged), 0);
}

#[test]
fn test_battery_charges_on_surplus() {
    let mut engine = engine();
    run(&mut engine, 60);
    let power = &engine.state().power;
    assert!(power.battery_kwh > 8.0);
    assert!(power.battery_kwh <= power.capacity_kwh);
}

#[test]
fn test_load_shed_precedes_deficit() {
    let mut engine = engine();
    engine.state_mut().power.base_generation_kw = 3.0;
    engine.state_mut().power.battery_kwh = 0.0;

    let events = engine.tick(1.0);

    let first_shed = events
        .iter()
        .position(|e| {
            matches!(
                e.data,
                EventData::StateChange {
                    cause: StateCause::LoadShed,
                    ..
                }
            )
        })
        .expect("load shed event");
    let deficit = events
        .iter()
        .position(|e| e.kind == EventKind::PowerDeficit)
        .expect("deficit event");
    assert!(first_shed < deficit);
    assert_eq!(events[deficit].severity, Severity::Critical);

    let state = engine.state();
    for sys in state.systems.values() {
        assert_eq!(sys.forced_offline, !sys.is_critical(), "{}", sys.id);
    }
    assert!(state.power.brownout);
    assert!(state.alert_active(AlertKey::PowerDeficit));

    // Deficit is reported once per brownout.
    let next = engine.tick(1.0);
    assert_eq!(count(&next, EventKind::PowerDeficit), 0);
}

#[test]
fn test_shed_order_highest_priority_number_first() {
    let mut engine = engine();
    // 5.7 kW generation against 6.0 kW load with an empty battery.
    engine.state_mut().power.battery_kwh = 0.0;
    engine.state_mut().power.base_generation_kw = 9.5;

    let events = engine.tick(1.0);
    let shed: Vec<SystemId> = events
        .iter()
        .filter_map(|e| match e.data {
            EventData::StateChange {
                system,
                cause: StateCause::LoadShed,
                ..
            } => Some(system),
            _ => None,
        })
        .collect();
    assert_eq!(shed, vec![SystemId::Security]);
    assert_eq!(count(&events, EventKind::PowerDeficit), 0);
}

#[test]
fn test_quality_collapse_sheds_all_non_critical() {
    let mut engine = engine();
    engine.state_mut().power.quality_offset = -0.9;

    let events = engine.tick(1.0);
    let collapsed = events
        .iter()
        .filter(|e| {
            matches!(
                e.data,
                EventData::StateChange {
                    cause: StateCause::QualityCollapse,
                    ..
                }
            )
        })
        .count();
    assert_eq!(collapsed, 4);
    for sys in engine.state().systems.values() {
        assert_eq!(sys.state == SystemState::Offline, !sys.is_critical());
    }
}

#[test]
fn test_quality_recomputed_after_collapse_shed() {
    let mut engine = engine();
    // Generation 3.0 kW against a 6.0 kW load: a deficit the battery covers.
    engine.state_mut().power.base_generation_kw = 5.0;
    engine.state_mut().power.quality_offset = -0.9;

    engine.tick(1.0);
    let state = engine.state();
    // Shedding cleared the deficit, so quality reflects the lighter bus.
    assert!((state.power.load_kw - 2.4).abs() < 1e-9);
    assert_eq!(state.power.deficit_ratio, 0.0);
    assert!((state.power.quality - 0.05).abs() < 1e-9);
}

#[test]
fn test_sustained_low_quality_sheds_one_per_interval() {
    let mut engine = engine();
    engine.state_mut().power.quality_offset = -0.7;

    run(&mut engine, 29);
    assert!(engine.state().systems.values().all(|s| !s.forced_offline));

    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::SystemStateChanged), 1);
    let forced: Vec<SystemId> = engine
        .state()
        .systems
        .values()
        .filter(|s| s.forced_offline)
        .map(|s| s.id)
        .collect();
    assert_eq!(forced, vec![SystemId::Security]);
}

#[test]
fn test_set_power_mode_reduces_load() {
    let mut engine = engine();
    let events = engine.apply_action(&Action::SetPowerMode {
        mode: PowerMode::Cruise,
    });
    assert_eq!(count(&events, EventKind::PowerModeChanged), 1);
    engine.tick(1.0);
    // 0.5 + 0.4 + 1.35 + 0.7 + 0.6 + 0.48 + 0.3
    assert!((engine.state().power.load_kw - 4.33).abs() < 1e-9);

    // Setting the current mode again is accepted silently.
    assert!(engine
        .apply_action(&Action::SetPowerMode {
            mode: PowerMode::Cruise
        })
        .is_empty());
}

// ---- Subsystems ----

#[test]
fn test_shed_and_restore() {
    let mut engine = engine();
    let events = engine.apply_action(&Action::ShedSystem {
        system: SystemId::DroneBay,
    });
    assert_eq!(count(&events, EventKind::SystemStateChanged), 1);
    assert_eq!(count(&events, EventKind::ServiceStopped), 1);
    assert_eq!(
        engine.state().system(SystemId::DroneBay).unwrap().state,
        SystemState::Offline
    );

    let again = engine.apply_action(&Action::ShedSystem {
        system: SystemId::DroneBay,
    });
    assert_eq!(blocked(&again), BlockReason::AlreadyOffline);

    let events = engine.apply_action(&Action::RestoreSystem {
        system: SystemId::DroneBay,
    });
    accepted(&events);
    let bay = engine.state().system(SystemId::DroneBay).unwrap();
    assert_eq!(bay.state, SystemState::Limited);
    assert!(!bay.forced_offline);
    // Services stay down until booted again.
    assert!(!bay.service_running());

    let not_forced = engine.apply_action(&Action::RestoreSystem {
        system: SystemId::DroneBay,
    });
    assert_eq!(blocked(&not_forced), BlockReason::NotForcedOffline);
}

#[test]
fn test_shed_critical_forbidden() {
    let mut engine = engine();
    let events = engine.apply_action(&Action::ShedSystem {
        system: SystemId::LifeSupport,
    });
    assert_eq!(blocked(&events), BlockReason::CriticalSystemShedForbidden);
    assert!(!engine.state().system(SystemId::LifeSupport).unwrap().forced_offline);
}

#[test]
fn test_restore_reports_first_unmet_dependency() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::ShedSystem {
        system: SystemId::DataCore,
    }));
    accepted(&engine.apply_action(&Action::ShedSystem {
        system: SystemId::Security,
    }));

    let events = engine.apply_action(&Action::RestoreSystem {
        system: SystemId::Security,
    });
    assert_eq!(blocked(&events), BlockReason::DependencyUnmet);
    match &events[0].data {
        EventData::Blocked { detail, .. } => assert_eq!(
            *detail,
            BlockDetail::Dependency {
                system: SystemId::Security,
                target: SystemId::DataCore,
                required: SystemState::Limited,
                current: Some(SystemState::Offline),
            }
        ),
        other => panic!("unexpected payload {other:?}"),
    }

    accepted(&engine.apply_action(&Action::RestoreSystem {
        system: SystemId::DataCore,
    }));
    accepted(&engine.apply_action(&Action::RestoreSystem {
        system: SystemId::Security,
    }));
}

#[test]
fn test_state_lock_freezes_then_catches_up() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::SetStateLock {
        system: SystemId::Sensors,
        locked: true,
    }));
    engine.state_mut().system_mut(SystemId::Sensors).unwrap().health = 0.1;

    let events = run(&mut engine, 5);
    assert_eq!(count(&events, EventKind::SystemStateChanged), 0);
    assert_eq!(
        engine.state().system(SystemId::Sensors).unwrap().state,
        SystemState::Limited
    );

    let events = engine.apply_action(&Action::SetStateLock {
        system: SystemId::Sensors,
        locked: false,
    });
    assert_eq!(count(&events, EventKind::StateLockChanged), 1);
    let change = events
        .iter()
        .find(|e| e.kind == EventKind::SystemStateChanged)
        .expect("state catches up on unlock");
    assert!(matches!(
        change.data,
        EventData::StateChange {
            new: SystemState::Critical,
            cause: StateCause::LockReleased,
            ..
        }
    ));
}

#[test]
fn test_forced_offline_survives_repair() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::ShedSystem {
        system: SystemId::Security,
    }));
    accepted(&engine.apply_action(&Action::RepairSystem {
        system: SystemId::Security,
        drone: D1,
    }));

    let events = run(&mut engine, 90);
    assert_eq!(count(&events, EventKind::SystemRepaired), 1);
    let security = engine.state().system(SystemId::Security).unwrap();
    assert!(security.health > 0.7);
    assert_eq!(security.state, SystemState::Offline);
}

// ---- Jobs ----

#[test]
fn test_repair_job_lifecycle() {
    let mut engine = engine();
    let events = engine.apply_action(&Action::RepairSystem {
        system: SystemId::PowerCore,
        drone: D1,
    });
    assert_eq!(count(&events, EventKind::JobQueued), 1);
    assert_eq!(engine.state().inventory.scrap, 15);
    assert_eq!(engine.state().jobs.len(), 1);

    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::JobStarted), 1);
    assert!(engine.state().jobs[0].is_running());
    // Running jobs draw power.
    assert!((engine.state().power.load_kw - 6.0).abs() < 1e-9);
    engine.tick(1.0);
    assert!((engine.state().power.load_kw - 6.4).abs() < 1e-9);

    let events = run(&mut engine, 88);
    assert_eq!(count(&events, EventKind::JobCompleted), 1);
    assert!(engine.state().jobs.is_empty());
    let core = engine.state().system(SystemId::PowerCore).unwrap();
    assert!(core.health > 0.84 && core.health < 0.85);
    assert_eq!(core.state, SystemState::Limited);
}

#[test]
fn test_repair_preconditions() {
    let mut engine = engine();

    let events = engine.apply_action(&Action::RepairSystem {
        system: SystemId::PowerCore,
        drone: DroneId(9),
    });
    assert_eq!(blocked(&events), BlockReason::UnknownDrone);

    engine.state_mut().drones.get_mut(&D2).unwrap().battery = 0.1;
    let events = engine.apply_action(&Action::RepairSystem {
        system: SystemId::PowerCore,
        drone: D2,
    });
    assert_eq!(blocked(&events), BlockReason::DroneBatteryLow);

    engine.state_mut().system_mut(SystemId::LifeSupport).unwrap().health = 1.0;
    let events = engine.apply_action(&Action::RepairSystem {
        system: SystemId::LifeSupport,
        drone: D1,
    });
    assert_eq!(blocked(&events), BlockReason::SystemFullyRepaired);

    engine.state_mut().inventory.scrap = 4;
    let events = engine.apply_action(&Action::RepairSystem {
        system: SystemId::PowerCore,
        drone: D1,
    });
    assert_eq!(blocked(&events), BlockReason::InsufficientScrap);
    assert!(engine.state().jobs.is_empty());
    assert_eq!(engine.state().inventory.scrap, 4);
}

#[test]
fn test_owner_runs_one_job_at_a_time() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::RepairSystem {
        system: SystemId::Sensors,
        drone: D1,
    }));
    accepted(&engine.apply_action(&Action::RepairSystem {
        system: SystemId::Security,
        drone: D1,
    }));

    for _ in 0..89 {
        engine.tick(1.0);
        let jobs = &engine.state().jobs;
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].status, JobStatus::Running);
        assert_eq!(jobs[1].status, JobStatus::Queued);
    }

    // The first finishes and the second is promoted on the same tick.
    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::JobCompleted), 1);
    assert_eq!(count(&events, EventKind::JobStarted), 1);
    assert_eq!(engine.state().jobs.len(), 1);
    assert!(engine.state().jobs[0].is_running());
}

#[test]
fn test_cancel_job_keeps_scrap_spent() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::RepairSystem {
        system: SystemId::PowerCore,
        drone: D1,
    }));
    let job = engine.state().jobs[0].id;
    engine.tick(1.0);

    let events = engine.apply_action(&Action::CancelJob { job });
    assert_eq!(count(&events, EventKind::JobCancelled), 1);
    assert!(engine.state().jobs.is_empty());
    assert_eq!(engine.state().inventory.scrap, 15);

    let events = engine.apply_action(&Action::CancelJob { job });
    assert_eq!(blocked(&events), BlockReason::UnknownJob);
    let events = engine.apply_action(&Action::CancelJob { job: JobId(999) });
    assert_eq!(blocked(&events), BlockReason::UnknownJob);
}

#[test]
fn test_boot_service() {
    let mut engine = engine();

    let events = engine.apply_action(&Action::BootService {
        system: SystemId::PowerCore,
    });
    assert_eq!(blocked(&events), BlockReason::ServiceNotInstalled);
    let events = engine.apply_action(&Action::BootService {
        system: SystemId::DataCore,
    });
    assert_eq!(blocked(&events), BlockReason::ServiceAlreadyRunning);

    accepted(&engine.apply_action(&Action::BootService {
        system: SystemId::Sensors,
    }));
    let events = engine.apply_action(&Action::BootService {
        system: SystemId::Sensors,
    });
    assert_eq!(blocked(&events), BlockReason::JobAlreadyQueued);

    let events = run(&mut engine, 45);
    assert_eq!(count(&events, EventKind::ServiceStarted), 1);
    assert!(engine.state().system(SystemId::Sensors).unwrap().service_running());
}

#[test]
fn test_boot_blocked_by_dependency_and_quality() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::ShedSystem {
        system: SystemId::DataCore,
    }));
    let events = engine.apply_action(&Action::BootService {
        system: SystemId::Security,
    });
    assert_eq!(blocked(&events), BlockReason::DependencyUnmet);

    let mut engine = self::engine();
    engine.state_mut().power.quality = 0.2;
    let events = engine.apply_action(&Action::BootService {
        system: SystemId::Sensors,
    });
    assert_eq!(blocked(&events), BlockReason::PowerQualityLow);
}

#[test]
fn test_boot_interrupted_when_subsystem_goes_offline() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::BootService {
        system: SystemId::Sensors,
    }));
    engine.tick(1.0);
    accepted(&engine.apply_action(&Action::ShedSystem {
        system: SystemId::Sensors,
    }));

    let events = engine.tick(1.0);
    let failure = events
        .iter()
        .find(|e| e.kind == EventKind::JobFailed)
        .expect("boot interrupted");
    assert!(matches!(
        failure.data,
        EventData::JobFailure {
            reason: FailureReason::Interrupted,
            ..
        }
    ));
    assert!(engine.state().jobs.is_empty());
}

#[test]
fn test_deploy_and_dock_cycle() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::sector("hull"),
        emergency: false,
    }));
    let events = run(&mut engine, 20);
    assert_eq!(count(&events, EventKind::DroneDeployed), 1);
    let drone = engine.state().drone(D1).unwrap();
    assert_eq!(drone.status, DroneStatus::Deployed);
    assert_eq!(drone.location, Location::sector("hull"));

    let events = engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::sector("cargo"),
        emergency: false,
    });
    assert_eq!(blocked(&events), BlockReason::DroneNotDocked);

    accepted(&engine.apply_action(&Action::DockDrone { drone: D1 }));
    let events = run(&mut engine, 20);
    assert_eq!(count(&events, EventKind::DroneDocked), 1);
    let drone = engine.state().drone(D1).unwrap();
    assert_eq!(drone.status, DroneStatus::Docked);
    assert_eq!(drone.location, Location::sector("drone_bay"));

    let events = engine.apply_action(&Action::DockDrone { drone: D1 });
    assert_eq!(blocked(&events), BlockReason::DroneNotDeployed);
}

#[test]
fn test_deploy_destination_checks() {
    let mut engine = engine();
    let events = engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::sector("bridge"),
        emergency: false,
    });
    assert_eq!(blocked(&events), BlockReason::UnknownSector);

    let events = engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::Node(NodeId::new("ice_belt")),
        emergency: false,
    });
    assert_eq!(blocked(&events), BlockReason::WrongLocation);

    let events = engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::Node(NodeId::new("nowhere")),
        emergency: false,
    });
    assert_eq!(blocked(&events), BlockReason::UnknownNode);
}

/// Failure reason of the first failed job of `kind`.
fn failure(events: &[Event], kind: JobKind) -> Option<FailureReason> {
    events.iter().find_map(|e| match e.data {
        EventData::JobFailure {
            kind: failed,
            reason,
            ..
        } if failed == kind => Some(reason),
        _ => None,
    })
}

#[test]
fn test_repair_queued_behind_deploy_is_interrupted() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::Node(NodeId::new("wreck_field")),
        emergency: false,
    }));
    // Still docked in the bay, so the repair is accepted and waits.
    accepted(&engine.apply_action(&Action::RepairSystem {
        system: SystemId::PowerCore,
        drone: D1,
    }));

    let events = run(&mut engine, 120);
    assert_eq!(count(&events, EventKind::DroneDeployed), 1);
    assert_eq!(count(&events, EventKind::SystemRepaired), 0);
    assert_eq!(failure(&events, JobKind::Repair), Some(FailureReason::Interrupted));
    assert!(engine.state().jobs.is_empty());
    assert!(engine.state().system(SystemId::PowerCore).unwrap().health < 0.6);
    assert_eq!(
        engine.state().drone(D1).unwrap().location,
        Location::Node(NodeId::new("wreck_field"))
    );
}

#[test]
fn test_second_deploy_of_same_drone_rejected() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::sector("hull"),
        emergency: false,
    }));
    let events = engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::sector("cargo"),
        emergency: true,
    });
    assert_eq!(blocked(&events), BlockReason::JobAlreadyQueued);
    assert_eq!(engine.state().jobs.len(), 1);

    let events = run(&mut engine, 40);
    assert_eq!(count(&events, EventKind::DroneDeployed), 1);
    assert_eq!(engine.state().drone(D1).unwrap().location, Location::sector("hull"));
}

#[test]
fn test_deploy_fails_when_drone_no_longer_docked() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::sector("hull"),
        emergency: false,
    }));
    {
        let drone = engine.state_mut().drones.get_mut(&D1).unwrap();
        drone.status = DroneStatus::Deployed;
        drone.location = Location::sector("cargo");
    }

    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::JobStarted), 1);
    assert_eq!(failure(&events, JobKind::Deploy), Some(FailureReason::Interrupted));
    assert_eq!(count(&events, EventKind::DroneDeployed), 0);
    assert!(engine.state().jobs.is_empty());
    assert_eq!(engine.state().drone(D1).unwrap().location, Location::sector("cargo"));
}

#[test]
fn test_emergency_risk_failure_disables_drone() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::sector("hull"),
        emergency: true,
    }));
    engine.state_mut().jobs[0].risk = Some(RiskProfile {
        p_fail_per_s: 1.0,
        p_glitch_per_s: 0.0,
    });

    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::DroneDisabled), 1);
    assert_eq!(failure(&events, JobKind::Deploy), Some(FailureReason::RiskRoll));
    assert_eq!(count(&events, EventKind::DroneDeployed), 0);
    assert!(engine.state().jobs.is_empty());

    let drone = engine.state().drone(D1).unwrap();
    assert_eq!(drone.status, DroneStatus::Disabled);
    assert!((drone.integrity - 0.70).abs() < 1e-9);
}

#[test]
fn test_emergency_glitch_damages_but_continues() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::sector("hull"),
        emergency: true,
    }));
    engine.state_mut().jobs[0].risk = Some(RiskProfile {
        p_fail_per_s: 0.0,
        p_glitch_per_s: 1.0,
    });

    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::JobGlitch), 1);
    assert_eq!(count(&events, EventKind::JobFailed), 0);
    assert!(engine.state().jobs[0].is_running());
    let drone = engine.state().drone(D1).unwrap();
    assert_eq!(drone.status, DroneStatus::Docked);
    assert!((drone.integrity - 0.95).abs() < 1e-9);

    // One glitch per second until the deploy lands.
    let events = run(&mut engine, 19);
    assert_eq!(count(&events, EventKind::JobGlitch), 19);
    assert_eq!(count(&events, EventKind::DroneDeployed), 1);
    assert_eq!(engine.state().drone(D1).unwrap().status, DroneStatus::Deployed);
}

#[test]
fn test_salvage_at_current_node() {
    let mut engine = engine();
    settle_bay(&mut engine);
    accepted(&engine.apply_action(&Action::DeployDrone {
        drone: D1,
        destination: Location::Node(NodeId::new("wreck_field")),
        emergency: false,
    }));
    run(&mut engine, 20);
    assert_eq!(engine.state().drone(D1).unwrap().status, DroneStatus::Deployed);

    accepted(&engine.apply_action(&Action::Salvage { drone: D1 }));
    let events = run(&mut engine, 120);
    assert_eq!(count(&events, EventKind::SalvageCompleted), 1);

    let state = engine.state();
    assert_eq!(state.inventory.scrap, 26);
    assert_eq!(state.nav.salvaged[&NodeId::new("wreck_field")], 6);
    let drone = state.drone(D1).unwrap();
    assert!(drone.radiation_dose > 0.0);
    assert!(drone.integrity < 1.0);
}

#[test]
fn test_salvage_requires_node_with_scrap() {
    let mut engine = engine();
    let events = engine.apply_action(&Action::Salvage { drone: D1 });
    assert_eq!(blocked(&events), BlockReason::DroneNotDeployed);

    {
        let drone = engine.state_mut().drones.get_mut(&D1).unwrap();
        drone.status = DroneStatus::Deployed;
        drone.location = Location::sector("hull");
    }
    let events = engine.apply_action(&Action::Salvage { drone: D1 });
    assert_eq!(blocked(&events), BlockReason::WrongLocation);

    engine.state_mut().drones.get_mut(&D1).unwrap().location =
        Location::Node(NodeId::new("wreck_field"));
    engine
        .state_mut()
        .nav
        .salvaged
        .insert(NodeId::new("wreck_field"), 30);
    let events = engine.apply_action(&Action::Salvage { drone: D1 });
    assert_eq!(blocked(&events), BlockReason::NodeDepleted);
}

#[test]
fn test_reboot_disabled_drone() {
    let mut engine = engine();
    let events = engine.apply_action(&Action::RebootDrone { drone: D2 });
    assert_eq!(blocked(&events), BlockReason::DroneNotDisabled);

    {
        let drone = engine.state_mut().drones.get_mut(&D2).unwrap();
        drone.status = DroneStatus::Disabled;
        drone.battery = 0.0;
    }
    accepted(&engine.apply_action(&Action::RebootDrone { drone: D2 }));
    let events = run(&mut engine, 30);
    assert!(engine.state().jobs.is_empty());

    let rebooted = count(&events, EventKind::DroneRebooted);
    let failed = count(&events, EventKind::JobFailed);
    assert_eq!(rebooted + failed, 1);
    let drone = engine.state().drone(D2).unwrap();
    if rebooted == 1 {
        assert_eq!(drone.status, DroneStatus::Docked);
        assert!(drone.battery >= 0.15);
    } else {
        assert_eq!(drone.status, DroneStatus::Disabled);
    }
}

#[test]
fn test_install_module() {
    let mut engine = engine();
    settle_bay(&mut engine);
    accepted(&engine.apply_action(&Action::InstallModule {
        module: ModuleId::new("capacitor_bank"),
    }));
    assert_eq!(engine.state().inventory.scrap, 12);
    let events = engine.apply_action(&Action::InstallModule {
        module: ModuleId::new("capacitor_bank"),
    });
    assert_eq!(blocked(&events), BlockReason::JobAlreadyQueued);

    let events = run(&mut engine, 90);
    assert_eq!(count(&events, EventKind::ModuleInstalled), 1);
    assert!((engine.state().power.capacity_kwh - 18.0).abs() < 1e-9);

    let events = engine.apply_action(&Action::InstallModule {
        module: ModuleId::new("capacitor_bank"),
    });
    assert_eq!(blocked(&events), BlockReason::ModuleAlreadyInstalled);

    let events = engine.apply_action(&Action::InstallModule {
        module: ModuleId::new("sensor_array"),
    });
    assert_eq!(blocked(&events), BlockReason::InsufficientScrap);
    match &events[0].data {
        EventData::Blocked { detail, .. } => assert_eq!(
            *detail,
            BlockDetail::Scrap {
                required: 15,
                available: 12
            }
        ),
        other => panic!("unexpected payload {other:?}"),
    }

    let events = engine.apply_action(&Action::InstallModule {
        module: ModuleId::new("warp_core"),
    });
    assert_eq!(blocked(&events), BlockReason::UnknownModule);
}

#[test]
fn test_module_upgrade_lifts_nominal_subsystem() {
    let mut engine = engine();
    engine.state_mut().system_mut(SystemId::PowerCore).unwrap().health = 0.95;
    accepted(&engine.apply_action(&Action::InstallModule {
        module: ModuleId::new("fusion_baffle"),
    }));
    run(&mut engine, 120);
    assert_eq!(
        engine.state().system(SystemId::PowerCore).unwrap().state,
        SystemState::Upgraded
    );

    // Generation picks up the bonus on the next power step.
    engine.tick(1.0);
    let state = engine.state();
    assert!((state.power.generation_kw - 13.0).abs() < 1e-9);
}

// ---- Navigation ----

#[test]
fn test_route_then_travel() {
    let mut engine = engine();
    let relay = NodeId::new("relay_station");

    let events = engine.apply_action(&Action::Travel {
        to: relay.clone(),
        profile: TravelProfile::Standard,
    });
    assert_eq!(blocked(&events), BlockReason::RouteUnknown);

    let events = engine.apply_action(&Action::SolveRoute {
        to: NodeId::new("ion_veil"),
    });
    assert_eq!(blocked(&events), BlockReason::OutOfSensorRange);

    accepted(&engine.apply_action(&Action::SolveRoute { to: relay.clone() }));
    let events = run(&mut engine, 54);
    assert_eq!(count(&events, EventKind::RouteSolved), 1);
    assert!(engine.state().nav.known_routes.contains(&relay));

    accepted(&engine.apply_action(&Action::Travel {
        to: relay.clone(),
        profile: TravelProfile::Standard,
    }));
    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::TravelStarted), 1);
    assert!(engine.state().nav.in_transit);

    let events = engine.apply_action(&Action::SolveRoute {
        to: NodeId::new("ice_belt"),
    });
    assert_eq!(blocked(&events), BlockReason::InTransit);

    let travel = engine.state().jobs[0].id;
    let events = engine.apply_action(&Action::CancelJob { job: travel });
    assert_eq!(blocked(&events), BlockReason::JobNotCancellable);

    let events = run(&mut engine, 161);
    assert_eq!(count(&events, EventKind::ArrivedAtNode), 1);
    let nav = &engine.state().nav;
    assert!(!nav.in_transit);
    assert_eq!(nav.current_node, relay);

    let events = engine.apply_action(&Action::SolveRoute { to: relay });
    assert_eq!(blocked(&events), BlockReason::AlreadyAtNode);
}

#[test]
fn test_cruise_travel_switches_power_mode() {
    let mut engine = engine();
    let relay = NodeId::new("relay_station");
    engine.state_mut().nav.known_routes.insert(relay.clone());

    accepted(&engine.apply_action(&Action::Travel {
        to: relay,
        profile: TravelProfile::Cruise,
    }));
    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::PowerModeChanged), 1);
    assert_eq!(engine.state().power.mode, PowerMode::Cruise);

    let events = engine.apply_action(&Action::SetPowerMode {
        mode: PowerMode::Normal,
    });
    assert_eq!(blocked(&events), BlockReason::InTransit);

    run(&mut engine, 250);
    assert!(!engine.state().nav.in_transit);
    assert_eq!(engine.state().power.mode, PowerMode::Normal);
}

#[test]
fn test_travel_strands_node_drones() {
    let mut engine = engine();
    let relay = NodeId::new("relay_station");
    engine.state_mut().nav.known_routes.insert(relay.clone());
    {
        let drone = engine.state_mut().drones.get_mut(&D1).unwrap();
        drone.status = DroneStatus::Deployed;
        drone.location = Location::Node(NodeId::new("wreck_field"));
    }

    accepted(&engine.apply_action(&Action::Salvage { drone: D1 }));
    accepted(&engine.apply_action(&Action::Travel {
        to: relay,
        profile: TravelProfile::Standard,
    }));

    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::DroneLost), 1);
    assert_eq!(engine.state().drone(D1).unwrap().status, DroneStatus::Lost);
    assert_eq!(engine.state().drone(D2).unwrap().status, DroneStatus::Docked);

    // The salvage run is interrupted on the next pass of the scheduler.
    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::JobFailed), 1);
    assert_eq!(engine.state().jobs.len(), 1);
    assert_eq!(engine.state().jobs[0].kind(), JobKind::Travel);
}

// ---- Drones ----

#[test]
fn test_docked_drone_charges_at_bay_rate() {
    let mut engine = engine();
    run(&mut engine, 10);
    // Net +0.6 kW charges at full rate, halved by a LIMITED bay.
    let battery = engine.state().drone(D2).unwrap().battery;
    assert!((battery - 0.57).abs() < 1e-9);
}

#[test]
fn test_bay_repair_consumes_scrap() {
    let mut engine = engine();
    run(&mut engine, 10);
    let drone = engine.state().drone(D2).unwrap();
    assert!((drone.integrity - 0.715).abs() < 1e-9);
    assert_eq!(engine.state().inventory.scrap, 19);
    // Drone 1 is already whole.
    assert_eq!(engine.state().drone(D1).unwrap().integrity, 1.0);
}

#[test]
fn test_critical_bay_repair_can_mishap() {
    let mut mishaps = 0;
    let mut clean = 0;
    for seed in 0..200 {
        let mut engine = SimulationEngine::new(SimConfig {
            seed,
            ..Default::default()
        });
        engine.state_mut().system_mut(SystemId::DroneBay).unwrap().health = 0.30;

        let events = run(&mut engine, 10);
        assert_eq!(
            engine.state().system(SystemId::DroneBay).unwrap().state,
            SystemState::Critical
        );
        // The step is paid for either way.
        assert_eq!(engine.state().inventory.scrap, 19);

        let integrity = engine.state().drone(D2).unwrap().integrity;
        match count(&events, EventKind::DroneRepairMishap) {
            0 => {
                assert!((integrity - 0.705).abs() < 1e-9, "seed {seed}: {integrity}");
                clean += 1;
            }
            1 => {
                assert!((integrity - 0.68).abs() < 1e-9, "seed {seed}: {integrity}");
                mishaps += 1;
            }
            n => panic!("seed {seed}: {n} mishaps from one repair step"),
        }
    }
    assert!((20..=80).contains(&mishaps), "{mishaps} mishaps in 200 seeds");
    assert!(clean > 0);
}

#[test]
fn test_offline_bay_stops_charging_and_repair() {
    let mut engine = engine();
    accepted(&engine.apply_action(&Action::ShedSystem {
        system: SystemId::DroneBay,
    }));
    let events = run(&mut engine, 20);

    let drone = engine.state().drone(D2).unwrap();
    assert_eq!(drone.battery, 0.55);
    assert_eq!(drone.integrity, 0.7);
    assert_eq!(engine.state().inventory.scrap, 20);
    assert!(engine.state().alert_active(AlertKey::DroneBayChargingUnavailable));
    assert_eq!(count(&events, EventKind::AlertRaised), 1);
}

#[test]
fn test_deployed_drone_disabled_when_battery_empty() {
    let mut engine = engine();
    {
        let drone = engine.state_mut().drones.get_mut(&D1).unwrap();
        drone.status = DroneStatus::Deployed;
        drone.location = Location::sector("hull");
        drone.battery = 0.0005;
    }
    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::DroneLowBattery), 1);
    assert_eq!(count(&events, EventKind::DroneDisabled), 1);
    assert_eq!(engine.state().drone(D1).unwrap().status, DroneStatus::Disabled);
}

// ---- Alerts ----

#[test]
fn test_alert_unacked_accrual_and_acknowledge() {
    let mut engine = engine();
    let events = run(&mut engine, 5);
    assert_eq!(count(&events, EventKind::AlertRaised), 0);
    let alert = engine.state().alert(AlertKey::PowerCoreDegraded).unwrap();
    assert_eq!(alert.unacked_s, 5);
    assert_eq!(alert.severity, Severity::Warning);

    let events = engine.apply_action(&Action::AcknowledgeAlert {
        key: AlertKey::PowerCoreDegraded,
    });
    assert_eq!(count(&events, EventKind::AlertAcknowledged), 1);
    run(&mut engine, 5);
    let alert = engine.state().alert(AlertKey::PowerCoreDegraded).unwrap();
    assert_eq!(alert.unacked_s, 5);
    assert!(alert.active);
}

#[test]
fn test_unacked_accrues_whole_seconds_only() {
    let mut engine = engine();
    engine.tick(0.5);
    assert_eq!(engine.state().alert(AlertKey::PowerCoreDegraded).unwrap().unacked_s, 0);
    engine.tick(0.5);
    assert_eq!(engine.state().alert(AlertKey::PowerCoreDegraded).unwrap().unacked_s, 1);
}

#[test]
fn test_alert_escalates_without_new_event() {
    let mut engine = engine();
    engine.state_mut().system_mut(SystemId::PowerCore).unwrap().health = 0.3;
    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::AlertRaised), 0);
    let alert = engine.state().alert(AlertKey::PowerCoreDegraded).unwrap();
    assert_eq!(alert.severity, Severity::Critical);
}

#[test]
fn test_cleared_alert_reraises_fresh() {
    let mut engine = engine();
    run(&mut engine, 3);
    accepted(&engine.apply_action(&Action::AcknowledgeAlert {
        key: AlertKey::PowerCoreDegraded,
    }));

    engine.state_mut().system_mut(SystemId::PowerCore).unwrap().health = 0.9;
    let events = engine.tick(1.0);
    assert!(events.iter().all(|e| e.kind != EventKind::AlertRaised));
    assert!(!engine.state().alert_active(AlertKey::PowerCoreDegraded));

    let events = engine.apply_action(&Action::AcknowledgeAlert {
        key: AlertKey::PowerCoreDegraded,
    });
    assert_eq!(blocked(&events), BlockReason::AlertInactive);

    engine.state_mut().system_mut(SystemId::PowerCore).unwrap().health = 0.5;
    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::AlertRaised), 1);
    let alert = engine.state().alert(AlertKey::PowerCoreDegraded).unwrap();
    assert!(alert.active);
    assert!(!alert.acknowledged);
    assert_eq!(alert.unacked_s, 0);
    assert_eq!(alert.first_seen, engine.state().now());
}

#[test]
fn test_distribution_unstable_after_sustained_period() {
    let mut engine = engine();
    run(&mut engine, 119);
    assert!(!engine.state().alert_active(AlertKey::DistributionUnstable));
    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::AlertRaised), 1);
    assert!(engine.state().alert_active(AlertKey::DistributionUnstable));
}

#[test]
fn test_acknowledge_unknown_alert() {
    let mut engine = engine();
    let events = engine.apply_action(&Action::AcknowledgeAlert {
        key: AlertKey::SocLow,
    });
    assert_eq!(blocked(&events), BlockReason::UnknownAlert);
}

// ---- Terminal lock ----

#[test]
fn test_terminal_lock_engages_and_clears() {
    let mut engine = engine();
    engine.state_mut().system_mut(SystemId::LifeSupport).unwrap().health = 0.0;
    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::TerminalLockEngaged), 1);
    assert!(engine.state().terminal_lock);

    let events = engine.apply_action(&Action::ShedSystem {
        system: SystemId::Security,
    });
    assert_eq!(blocked(&events), BlockReason::TerminalLock);
    accepted(&engine.apply_action(&Action::AcknowledgeAlert {
        key: AlertKey::PowerCoreDegraded,
    }));
    accepted(&engine.apply_action(&Action::RepairSystem {
        system: SystemId::LifeSupport,
        drone: D1,
    }));

    // Time alone does not clear the lock.
    let events = run(&mut engine, 89);
    assert_eq!(count(&events, EventKind::TerminalLockCleared), 0);
    assert!(engine.state().terminal_lock);

    let events = engine.tick(1.0);
    assert_eq!(count(&events, EventKind::TerminalLockCleared), 1);
    assert!(!engine.state().terminal_lock);
    assert_eq!(
        engine.state().system(SystemId::LifeSupport).unwrap().state,
        SystemState::Critical
    );
}

// ---- Hooks ----

#[test]
fn test_job_hook_sees_completed_job_and_its_events() {
    let seen: Arc<Mutex<Vec<(JobKind, Vec<EventKind>)>>> = Arc::default();
    let sink = Arc::clone(&seen);

    let mut engine = engine();
    engine.add_hook(move |job: &derelict_core::jobs::Job, events: &[Event]| {
        sink.lock()
            .unwrap()
            .push((job.kind(), events.iter().map(|e| e.kind).collect()));
    });

    accepted(&engine.apply_action(&Action::RepairSystem {
        system: SystemId::PowerCore,
        drone: D1,
    }));
    run(&mut engine, 90);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (kind, kinds) = &seen[0];
    assert_eq!(*kind, JobKind::Repair);
    assert!(kinds.contains(&EventKind::SystemRepaired));
    assert!(kinds.contains(&EventKind::JobCompleted));
    assert!(!kinds.contains(&EventKind::JobStarted));
}

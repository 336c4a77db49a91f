//! Action validation and application.
//!
//! Every handler checks all of its preconditions before touching state, so
//! a blocked action leaves the aggregate exactly as it found it.

use derelict_core::catalog::{Catalog, NodeDef};
use derelict_core::commands::Action;
use derelict_core::components::Drone;
use derelict_core::constants::*;
use derelict_core::enums::{
    AlertKey, DroneStatus, JobKind, PowerMode, Severity, StateCause, SystemId, SystemState,
    TravelProfile,
};
use derelict_core::events::{BlockDetail, BlockReason, Event, EventData, EventKind};
use derelict_core::jobs::{Job, JobSpec, RiskProfile};
use derelict_core::state::SimState;
use derelict_core::types::{DroneId, JobId, Location, ModuleId, NodeId, Source, TargetRef};
use tracing::{debug, info};

use crate::gate::{self, UnmetDependency};
use crate::systems::{jobs, subsystems};

/// Why an action was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Blocked {
    pub reason: BlockReason,
    pub detail: BlockDetail,
}

impl Blocked {
    pub fn new(reason: BlockReason) -> Self {
        Self {
            reason,
            detail: BlockDetail::None,
        }
    }

    fn target(reason: BlockReason, target: TargetRef) -> Self {
        Self {
            reason,
            detail: BlockDetail::Target { target },
        }
    }

    fn threshold(reason: BlockReason, required: f64, current: f64) -> Self {
        Self {
            reason,
            detail: BlockDetail::Threshold { required, current },
        }
    }

    fn scrap(required: u32, available: u32) -> Self {
        Self {
            reason: BlockReason::InsufficientScrap,
            detail: BlockDetail::Scrap {
                required,
                available,
            },
        }
    }
}

impl From<UnmetDependency> for Blocked {
    fn from(unmet: UnmetDependency) -> Self {
        Self {
            reason: BlockReason::DependencyUnmet,
            detail: unmet.detail(),
        }
    }
}

type Outcome = Result<(), Blocked>;

/// Build the single `action_blocked` event for a rejection.
pub fn blocked_event(action: &Action, blocked: Blocked) -> Event {
    Event::new(
        EventKind::ActionBlocked,
        Severity::Warning,
        Source::Ship,
        format!("{} blocked: {}", action.name(), blocked.reason.code()),
    )
    .with_data(EventData::Blocked {
        action: action.name().to_string(),
        reason: blocked.reason,
        detail: blocked.detail,
    })
}

/// Validate and apply one action.
pub fn apply(state: &mut SimState, catalog: &Catalog, action: &Action) -> Outcome {
    let life_support_repair = matches!(
        action,
        Action::RepairSystem {
            system: SystemId::LifeSupport,
            ..
        }
    );
    if state.terminal_lock && !action.is_diagnostic() && !life_support_repair {
        return Err(Blocked::new(BlockReason::TerminalLock));
    }

    match action {
        Action::RepairSystem { system, drone } => repair_system(state, *system, *drone),
        Action::BootService { system } => boot_service(state, *system),
        Action::ShedSystem { system } => shed_system(state, *system),
        Action::RestoreSystem { system } => restore_system(state, *system),
        Action::SetStateLock { system, locked } => set_state_lock(state, *system, *locked),
        Action::SetPowerMode { mode } => set_power_mode(state, *mode),
        Action::DeployDrone {
            drone,
            destination,
            emergency,
        } => deploy_drone(state, catalog, *drone, destination, *emergency),
        Action::DockDrone { drone } => dock_drone(state, *drone),
        Action::Salvage { drone } => salvage(state, catalog, *drone),
        Action::RebootDrone { drone } => reboot_drone(state, *drone),
        Action::SolveRoute { to } => solve_route(state, catalog, to),
        Action::Travel { to, profile } => travel(state, catalog, to, *profile),
        Action::InstallModule { module } => install_module(state, catalog, module),
        Action::CancelJob { job } => cancel_job(state, *job),
        Action::AcknowledgeAlert { key } => acknowledge_alert(state, *key),
    }
}

/// Enqueue a validated job and emit `job_queued`.
fn enqueue(state: &mut SimState, spec: JobSpec, eta_s: f64, risk: Option<RiskProfile>) -> JobId {
    let t = state.now();
    let id = state.allocate_job_id();
    let mut job = Job::new(id, spec, eta_s, t);
    if let Some(risk) = risk {
        job = job.with_risk(risk);
    }
    debug!(job = %id, kind = %job.kind(), eta_s, "job queued");
    state.events.push(
        t,
        Event::new(
            EventKind::JobQueued,
            Severity::Info,
            Source::Job(id),
            format!("{} {} queued (ETA {:.0}s)", job.kind(), id, eta_s),
        )
        .with_data(EventData::Job {
            job: id,
            kind: job.kind(),
            eta_s,
        }),
    );
    state.jobs.push(job);
    id
}

fn job_pending(state: &SimState, matches: impl Fn(&JobSpec) -> bool) -> bool {
    state
        .jobs
        .iter()
        .any(|j| !j.status.is_terminal() && matches(&j.spec))
}

fn known_system(state: &SimState, id: SystemId) -> Result<(), Blocked> {
    if state.system(id).is_some() {
        Ok(())
    } else {
        Err(Blocked::target(BlockReason::UnknownSystem, TargetRef::System(id)))
    }
}

fn known_drone(state: &SimState, id: DroneId) -> Result<&Drone, Blocked> {
    state
        .drone(id)
        .ok_or_else(|| Blocked::target(BlockReason::UnknownDrone, TargetRef::Drone(id)))
}

fn known_node<'a>(catalog: &'a Catalog, id: &NodeId) -> Result<&'a NodeDef, Blocked> {
    catalog
        .node(id)
        .ok_or_else(|| Blocked::target(BlockReason::UnknownNode, TargetRef::Node(id.clone())))
}

/// A drone at a world node can only be worked on while the ship is parked there.
fn reachable(state: &SimState, location: &Location) -> Outcome {
    let Location::Node(node) = location else {
        return Ok(());
    };
    if state.nav.in_transit {
        return Err(Blocked::new(BlockReason::InTransit));
    }
    if !state.nav.is_at(node) {
        return Err(Blocked::target(BlockReason::WrongLocation, TargetRef::Node(node.clone())));
    }
    Ok(())
}

fn fit_for_work(drone: &Drone) -> Outcome {
    if drone.battery < DRONE_MIN_BATTERY {
        return Err(Blocked::threshold(
            BlockReason::DroneBatteryLow,
            DRONE_MIN_BATTERY,
            drone.battery,
        ));
    }
    if drone.integrity < DRONE_MIN_INTEGRITY {
        return Err(Blocked::threshold(
            BlockReason::DroneIntegrityLow,
            DRONE_MIN_INTEGRITY,
            drone.integrity,
        ));
    }
    Ok(())
}

fn sensor_range_factor(state: SystemState) -> f64 {
    match state {
        SystemState::Upgraded => 1.25,
        SystemState::Nominal => 1.0,
        SystemState::Limited => 0.8,
        SystemState::Damaged => 0.6,
        SystemState::Critical | SystemState::Offline => 0.0,
    }
}

/// Current sensor range in map units.
pub fn sensor_range(state: &SimState) -> f64 {
    let sensors = state.system(SystemId::Sensors).map_or(SystemState::Offline, |s| s.state);
    SENSOR_RANGE_BASE * sensor_range_factor(sensors)
}

// ---- Subsystem actions ----

fn repair_system(state: &mut SimState, system: SystemId, drone_id: DroneId) -> Outcome {
    known_system(state, system)?;
    let drone = known_drone(state, drone_id)?;
    if !drone.is_operational() {
        return Err(Blocked::target(BlockReason::DroneUnavailable, TargetRef::Drone(drone_id)));
    }
    if !drone.location.is_aboard() {
        return Err(Blocked::target(BlockReason::WrongLocation, TargetRef::Drone(drone_id)));
    }
    fit_for_work(drone)?;
    let health = state.system(system).map_or(0.0, |s| s.health);
    if health >= 1.0 {
        return Err(Blocked::target(
            BlockReason::SystemFullyRepaired,
            TargetRef::System(system),
        ));
    }
    if state.inventory.scrap < REPAIR_SCRAP_COST {
        return Err(Blocked::scrap(REPAIR_SCRAP_COST, state.inventory.scrap));
    }

    state.inventory.scrap -= REPAIR_SCRAP_COST;
    enqueue(
        state,
        JobSpec::Repair {
            system,
            drone: drone_id,
            amount: REPAIR_AMOUNT,
        },
        REPAIR_ETA_S,
        None,
    );
    Ok(())
}

fn boot_service(state: &mut SimState, system: SystemId) -> Outcome {
    let Some(sys) = state.system(system) else {
        return Err(Blocked::target(BlockReason::UnknownSystem, TargetRef::System(system)));
    };
    let Some(service) = sys.service.as_ref().filter(|s| s.installed) else {
        return Err(Blocked::target(
            BlockReason::ServiceNotInstalled,
            TargetRef::System(system),
        ));
    };
    if service.running {
        return Err(Blocked::target(
            BlockReason::ServiceAlreadyRunning,
            TargetRef::System(system),
        ));
    }
    let boot_s = service.boot_s;
    if job_pending(state, |spec| matches!(spec, JobSpec::BootService { system: s } if *s == system)) {
        return Err(Blocked::target(BlockReason::JobAlreadyQueued, TargetRef::System(system)));
    }
    if sys.state == SystemState::Offline {
        return Err(Blocked::target(BlockReason::SystemOffline, TargetRef::System(system)));
    }
    gate::check_hard(&state.systems, system)?;
    if state.power.quality < BOOT_MIN_QUALITY {
        return Err(Blocked::threshold(
            BlockReason::PowerQualityLow,
            BOOT_MIN_QUALITY,
            state.power.quality,
        ));
    }

    enqueue(state, JobSpec::BootService { system }, boot_s, None);
    Ok(())
}

fn shed_system(state: &mut SimState, system: SystemId) -> Outcome {
    let t = state.now();
    let Some(sys) = state.systems.get_mut(&system) else {
        return Err(Blocked::target(BlockReason::UnknownSystem, TargetRef::System(system)));
    };
    if sys.is_critical() {
        return Err(Blocked::target(
            BlockReason::CriticalSystemShedForbidden,
            TargetRef::System(system),
        ));
    }
    if sys.forced_offline {
        return Err(Blocked::target(BlockReason::AlreadyOffline, TargetRef::System(system)));
    }

    sys.forced_offline = true;
    subsystems::reevaluate(sys, StateCause::ManualShed, t, &mut state.events);
    info!(system = %system, "subsystem shed by operator");
    Ok(())
}

fn restore_system(state: &mut SimState, system: SystemId) -> Outcome {
    known_system(state, system)?;
    if !state.system(system).is_some_and(|s| s.forced_offline) {
        return Err(Blocked::target(
            BlockReason::NotForcedOffline,
            TargetRef::System(system),
        ));
    }
    gate::check_hard(&state.systems, system)?;

    let t = state.now();
    if let Some(sys) = state.systems.get_mut(&system) {
        sys.forced_offline = false;
        subsystems::reevaluate(sys, StateCause::ManualRestore, t, &mut state.events);
    }
    info!(system = %system, "subsystem restored");
    Ok(())
}

fn set_state_lock(state: &mut SimState, system: SystemId, locked: bool) -> Outcome {
    let t = state.now();
    let Some(sys) = state.systems.get_mut(&system) else {
        return Err(Blocked::target(BlockReason::UnknownSystem, TargetRef::System(system)));
    };

    sys.state_locked = locked;
    state.events.push(
        t,
        Event::new(
            EventKind::StateLockChanged,
            Severity::Info,
            Source::System(system),
            if locked {
                format!("{system} state locked at {}", sys.state)
            } else {
                format!("{system} state unlocked")
            },
        )
        .with_data(EventData::Lock { system, locked }),
    );
    if !locked {
        subsystems::reevaluate(sys, StateCause::LockReleased, t, &mut state.events);
    }
    Ok(())
}

fn set_power_mode(state: &mut SimState, mode: PowerMode) -> Outcome {
    if state.nav.in_transit {
        return Err(Blocked::new(BlockReason::InTransit));
    }
    if state.power.mode != mode {
        jobs::set_mode(state, mode);
    }
    Ok(())
}

// ---- Drone actions ----

fn deploy_drone(
    state: &mut SimState,
    catalog: &Catalog,
    drone_id: DroneId,
    destination: &Location,
    emergency: bool,
) -> Outcome {
    let drone = known_drone(state, drone_id)?;
    if drone.status != DroneStatus::Docked {
        return Err(Blocked::target(BlockReason::DroneNotDocked, TargetRef::Drone(drone_id)));
    }
    let deploying = job_pending(state, |spec| {
        matches!(spec, JobSpec::Deploy { drone, .. } if *drone == drone_id)
    });
    if deploying {
        return Err(Blocked::target(BlockReason::JobAlreadyQueued, TargetRef::Drone(drone_id)));
    }
    fit_for_work(drone)?;

    match destination {
        Location::Sector(name) => {
            if !catalog.has_sector(name) {
                return Err(Blocked::new(BlockReason::UnknownSector));
            }
        }
        Location::Node(node) => {
            known_node(catalog, node)?;
            reachable(state, destination)?;
        }
    }

    if !emergency {
        let bay = state.system(SystemId::DroneBay).map(|s| s.state);
        if bay.map_or(true, |s| s == SystemState::Offline) {
            return Err(Blocked {
                reason: BlockReason::DroneBayDeployOffline,
                detail: BlockDetail::Dependency {
                    system: SystemId::DroneBay,
                    target: SystemId::DroneBay,
                    required: SystemState::Critical,
                    current: bay,
                },
            });
        }
        gate::check_hard(&state.systems, SystemId::DroneBay)?;
    }

    let spec = JobSpec::Deploy {
        drone: drone_id,
        destination: destination.clone(),
    };
    let risk = emergency.then(RiskProfile::emergency);
    enqueue(state, spec, DEPLOY_ETA_S, risk);
    if emergency {
        info!(drone = %drone_id, "emergency deploy bypassing bay checks");
    }
    Ok(())
}

fn dock_drone(state: &mut SimState, drone_id: DroneId) -> Outcome {
    let drone = known_drone(state, drone_id)?;
    if drone.status != DroneStatus::Deployed {
        return Err(Blocked::target(BlockReason::DroneNotDeployed, TargetRef::Drone(drone_id)));
    }
    reachable(state, &drone.location)?;
    let from = drone.location.clone();

    enqueue(state, JobSpec::Dock { drone: drone_id, from }, DOCK_ETA_S, None);
    Ok(())
}

fn salvage(state: &mut SimState, catalog: &Catalog, drone_id: DroneId) -> Outcome {
    let drone = known_drone(state, drone_id)?;
    if drone.status != DroneStatus::Deployed {
        return Err(Blocked::target(BlockReason::DroneNotDeployed, TargetRef::Drone(drone_id)));
    }
    let Location::Node(node) = &drone.location else {
        return Err(Blocked::target(BlockReason::WrongLocation, TargetRef::Drone(drone_id)));
    };
    reachable(state, &drone.location)?;
    let def = known_node(catalog, node)?;
    let taken = state.nav.salvaged.get(node).copied().unwrap_or(0);
    if def.salvage_scrap.saturating_sub(taken) == 0 {
        return Err(Blocked::target(BlockReason::NodeDepleted, TargetRef::Node(node.clone())));
    }
    let node = node.clone();

    enqueue(state, JobSpec::Salvage { drone: drone_id, node }, SALVAGE_ETA_S, None);
    Ok(())
}

fn reboot_drone(state: &mut SimState, drone_id: DroneId) -> Outcome {
    let drone = known_drone(state, drone_id)?;
    if drone.status != DroneStatus::Disabled {
        return Err(Blocked::target(BlockReason::DroneNotDisabled, TargetRef::Drone(drone_id)));
    }
    reachable(state, &drone.location)?;

    enqueue(state, JobSpec::Reboot { drone: drone_id }, REBOOT_ETA_S, None);
    Ok(())
}

// ---- Navigation ----

fn solve_route(state: &mut SimState, catalog: &Catalog, to: &NodeId) -> Outcome {
    known_node(catalog, to)?;
    if state.nav.in_transit {
        return Err(Blocked::new(BlockReason::InTransit));
    }
    if &state.nav.current_node == to {
        return Err(Blocked::target(BlockReason::AlreadyAtNode, TargetRef::Node(to.clone())));
    }
    if state.nav.known_routes.contains(to) {
        return Err(Blocked::target(BlockReason::RouteAlreadyKnown, TargetRef::Node(to.clone())));
    }
    if job_pending(state, |spec| matches!(spec, JobSpec::RouteSolve { to: t } if t == to)) {
        return Err(Blocked::target(BlockReason::JobAlreadyQueued, TargetRef::Node(to.clone())));
    }
    gate::require_state(&state.systems, SystemId::Sensors, SystemId::Sensors, SystemState::Damaged)?;
    let distance = catalog
        .distance(&state.nav.current_node, to)
        .ok_or_else(|| {
            Blocked::target(BlockReason::UnknownNode, TargetRef::Node(state.nav.current_node.clone()))
        })?;
    let range = sensor_range(state);
    if distance > range {
        return Err(Blocked::threshold(BlockReason::OutOfSensorRange, distance, range));
    }

    let eta_s = (distance * ROUTE_SOLVE_S_PER_UNIT).max(ROUTE_SOLVE_MIN_S);
    enqueue(state, JobSpec::RouteSolve { to: to.clone() }, eta_s, None);
    Ok(())
}

fn travel(state: &mut SimState, catalog: &Catalog, to: &NodeId, profile: TravelProfile) -> Outcome {
    known_node(catalog, to)?;
    if &state.nav.current_node == to && !state.nav.in_transit {
        return Err(Blocked::target(BlockReason::AlreadyAtNode, TargetRef::Node(to.clone())));
    }
    if state.nav.in_transit {
        return Err(Blocked::new(BlockReason::InTransit));
    }
    if !state.nav.known_routes.contains(to) {
        return Err(Blocked::target(BlockReason::RouteUnknown, TargetRef::Node(to.clone())));
    }
    if job_pending(state, |spec| spec.kind() == JobKind::Travel) {
        return Err(Blocked::new(BlockReason::JobAlreadyQueued));
    }
    gate::require_state(
        &state.systems,
        SystemId::PowerCore,
        SystemId::PowerCore,
        SystemState::Damaged,
    )?;
    let distance = catalog
        .distance(&state.nav.current_node, to)
        .ok_or_else(|| {
            Blocked::target(BlockReason::UnknownNode, TargetRef::Node(state.nav.current_node.clone()))
        })?;

    let factor = match profile {
        TravelProfile::Standard => 1.0,
        TravelProfile::Cruise => CRUISE_TRAVEL_FACTOR,
    };
    let eta_s = distance * TRAVEL_S_PER_UNIT * factor;
    enqueue(state, JobSpec::Travel { to: to.clone(), profile }, eta_s, None);
    Ok(())
}

// ---- Ship ----

fn install_module(state: &mut SimState, catalog: &Catalog, module: &ModuleId) -> Outcome {
    let Some(def) = catalog.module(module) else {
        return Err(Blocked::target(BlockReason::UnknownModule, TargetRef::Module(module.clone())));
    };
    if state.inventory.installed_modules.contains(module) {
        return Err(Blocked::target(
            BlockReason::ModuleAlreadyInstalled,
            TargetRef::Module(module.clone()),
        ));
    }
    if job_pending(state, |spec| matches!(spec, JobSpec::InstallModule { module: m, .. } if m == module)) {
        return Err(Blocked::target(BlockReason::JobAlreadyQueued, TargetRef::Module(module.clone())));
    }
    if state.inventory.scrap < def.scrap_cost {
        return Err(Blocked::scrap(def.scrap_cost, state.inventory.scrap));
    }

    state.inventory.scrap -= def.scrap_cost;
    let spec = JobSpec::InstallModule {
        module: module.clone(),
        effect: def.effect.clone(),
    };
    enqueue(state, spec, def.install_s, None);
    Ok(())
}

fn cancel_job(state: &mut SimState, job_id: JobId) -> Outcome {
    let Some(index) = state.jobs.iter().position(|j| j.id == job_id) else {
        return Err(Blocked::target(BlockReason::UnknownJob, TargetRef::Job(job_id)));
    };
    let job = &state.jobs[index];
    if job.status.is_terminal() || (job.kind() == JobKind::Travel && job.is_running()) {
        return Err(Blocked::target(BlockReason::JobNotCancellable, TargetRef::Job(job_id)));
    }

    let t = state.now();
    let job = state.jobs.remove(index);
    info!(job = %job_id, kind = %job.kind(), "job cancelled");
    state.events.push(
        t,
        Event::new(
            EventKind::JobCancelled,
            Severity::Warning,
            Source::Job(job_id),
            format!("{} {} cancelled", job.kind(), job_id),
        )
        .with_data(EventData::Job {
            job: job_id,
            kind: job.kind(),
            eta_s: job.eta_s,
        }),
    );
    Ok(())
}

fn acknowledge_alert(state: &mut SimState, key: AlertKey) -> Outcome {
    let t = state.now();
    let Some(alert) = state.alerts.get_mut(&key) else {
        return Err(Blocked::target(BlockReason::UnknownAlert, TargetRef::Alert(key)));
    };
    if !alert.active {
        return Err(Blocked::target(BlockReason::AlertInactive, TargetRef::Alert(key)));
    }

    alert.acknowledged = true;
    state.events.push(
        t,
        Event::new(
            EventKind::AlertAcknowledged,
            Severity::Info,
            Source::Alert(key),
            format!("{key} acknowledged"),
        )
        .with_data(EventData::Alert {
            key,
            severity: alert.severity,
        }),
    );
    Ok(())
}

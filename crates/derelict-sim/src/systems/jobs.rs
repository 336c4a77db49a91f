//! Job scheduler: promotion, interruption, emergency risk, countdown and
//! completion effects.

use std::ops::Range;

use derelict_core::catalog::{Catalog, ModuleEffect};
use derelict_core::constants::*;
use derelict_core::enums::{
    DroneStatus, FailureReason, JobStatus, PowerMode, Severity, StateCause, TravelProfile,
};
use derelict_core::events::{Event, EventData, EventKind};
use derelict_core::jobs::{Job, JobSpec};
use derelict_core::state::SimState;
use derelict_core::types::{DroneId, Location, ModuleId, NodeId, Source};
use tracing::{debug, info, warn};

use super::subsystems;
use crate::rng::{self, RollStream};

/// A job that completed this tick, with the sequence range of the events
/// its effect produced.
#[derive(Debug, Clone)]
pub struct CompletedJob {
    pub job: Job,
    pub events: Range<u64>,
}

/// Reboot success probability, linear in integrity.
pub fn reboot_probability(integrity: f64) -> f64 {
    (REBOOT_P_MIN + (REBOOT_P_MAX - REBOOT_P_MIN) * integrity).clamp(REBOOT_P_MIN, REBOOT_P_MAX)
}

fn job_event(kind: EventKind, severity: Severity, job: &Job, message: String) -> Event {
    Event::new(kind, severity, Source::Job(job.id), message).with_data(EventData::Job {
        job: job.id,
        kind: job.kind(),
        eta_s: job.eta_s,
    })
}

/// Mark a job failed and emit `job_failed`.
pub fn fail(state: &mut SimState, job: &mut Job, reason: FailureReason, why: &str) {
    let t = state.now();
    job.status = JobStatus::Failed;
    warn!(job = %job.id, kind = %job.kind(), ?reason, "job failed: {why}");
    state.events.push(
        t,
        Event::new(
            EventKind::JobFailed,
            Severity::Warning,
            Source::Job(job.id),
            format!("{} {} failed: {why}", job.kind(), job.id),
        )
        .with_data(EventData::JobFailure {
            job: job.id,
            kind: job.kind(),
            reason,
        }),
    );
}

/// Advance every active job by `dt`. Terminal jobs are removed.
pub fn run(state: &mut SimState, catalog: &Catalog, dt: f64) -> Vec<CompletedJob> {
    let mut jobs = std::mem::take(&mut state.jobs);
    let mut completed = Vec::new();

    for i in 0..jobs.len() {
        if jobs[i].status == JobStatus::Queued {
            if let Some(owner) = jobs[i].owner {
                let busy = jobs
                    .iter()
                    .enumerate()
                    .any(|(k, j)| k != i && j.owner == Some(owner) && j.is_running());
                if busy {
                    continue;
                }
            }
            jobs[i].status = JobStatus::Running;
            on_start(state, &jobs[i]);
        }
        if !jobs[i].is_running() {
            continue;
        }

        let job = &mut jobs[i];

        if let Some(why) = interruption(state, job) {
            fail(state, job, FailureReason::Interrupted, why);
            continue;
        }

        if let Some(risk) = job.risk {
            if roll_risk(state, job, risk.p_fail_per_s, risk.p_glitch_per_s, dt) {
                continue;
            }
        }

        job.eta_s -= dt;
        if job.eta_s <= 0.0 {
            job.eta_s = 0.0;
            let first = state.events.total_recorded();
            complete(state, catalog, job);
            let last = state.events.total_recorded();
            if job.status == JobStatus::Completed {
                completed.push(CompletedJob {
                    job: job.clone(),
                    events: first..last,
                });
            }
        }
    }

    jobs.retain(|j| !j.status.is_terminal());
    state.jobs = jobs;
    completed
}

fn on_start(state: &mut SimState, job: &Job) {
    let t = state.now();
    debug!(job = %job.id, kind = %job.kind(), "job started");
    state.events.push(
        t,
        job_event(
            EventKind::JobStarted,
            Severity::Info,
            job,
            format!("{} {} started", job.kind(), job.id),
        ),
    );

    if let JobSpec::Travel { to, profile } = &job.spec {
        start_travel(state, to, *profile);
    }
}

fn start_travel(state: &mut SimState, to: &NodeId, profile: TravelProfile) {
    let t = state.now();
    state.nav.in_transit = true;
    state.nav.destination = Some(to.clone());

    if profile == TravelProfile::Cruise && state.power.mode != PowerMode::Cruise {
        set_mode(state, PowerMode::Cruise);
    }

    for drone in state.drones.values_mut() {
        let stranded = matches!(drone.status, DroneStatus::Deployed | DroneStatus::Disabled)
            && !drone.location.is_aboard();
        if !stranded {
            continue;
        }
        drone.status = DroneStatus::Lost;
        warn!(drone = %drone.id, "drone left behind");
        state.events.push(
            t,
            Event::new(
                EventKind::DroneLost,
                Severity::Critical,
                Source::Drone(drone.id),
                format!("{} lost: ship departed without it", drone.id),
            )
            .with_data(EventData::Drone {
                drone: drone.id,
                battery: drone.battery,
                integrity: drone.integrity,
            }),
        );
    }

    info!(destination = %to, "travel started");
    state.events.push(
        t,
        Event::new(
            EventKind::TravelStarted,
            Severity::Info,
            Source::Ship,
            format!("Departed {} for {to}", state.nav.current_node),
        )
        .with_data(EventData::Navigation { node: to.clone() }),
    );
}

/// Switch power mode, emitting `power_mode_changed`.
pub fn set_mode(state: &mut SimState, mode: PowerMode) {
    let t = state.now();
    state.power.mode = mode;
    state.events.push(
        t,
        Event::new(
            EventKind::PowerModeChanged,
            Severity::Info,
            Source::Power,
            format!("Power mode set to {mode}"),
        )
        .with_data(EventData::Mode { mode }),
    );
}

/// Interruption for drone jobs tied to a world node the ship must stay at.
fn node_drone_stranded(state: &SimState, location: &Location) -> Option<&'static str> {
    let Location::Node(node) = location else {
        return None;
    };
    if state.nav.in_transit {
        Some("ship entered transit")
    } else if !state.nav.is_at(node) {
        Some("ship left the node")
    } else {
        None
    }
}

/// Reason a job can no longer proceed. Checked when a queued job is
/// promoted and on every tick it runs, since a drone's status and location
/// may change while its job waits behind another.
fn interruption(state: &SimState, job: &Job) -> Option<&'static str> {
    let drone_of = |id: DroneId| state.drone(id);
    match &job.spec {
        JobSpec::Repair { drone, .. } => match drone_of(*drone) {
            Some(d) if !d.is_operational() => Some("drone unavailable"),
            Some(d) if !d.location.is_aboard() => Some("drone left the ship"),
            Some(_) => None,
            None => Some("drone unavailable"),
        },
        JobSpec::BootService { system } => match state.system(*system) {
            Some(s) if s.is_powered() => None,
            _ => Some("subsystem offline"),
        },
        JobSpec::Deploy { drone, destination } => match drone_of(*drone) {
            Some(d) if d.status == DroneStatus::Docked => node_drone_stranded(state, destination),
            _ => Some("drone no longer docked"),
        },
        JobSpec::Dock { drone, from } => match drone_of(*drone) {
            Some(d) if d.status == DroneStatus::Deployed => node_drone_stranded(state, from),
            _ => Some("drone no longer deployed"),
        },
        JobSpec::Salvage { drone, node } => match drone_of(*drone) {
            Some(d)
                if d.status == DroneStatus::Deployed
                    && d.location == Location::Node(node.clone()) =>
            {
                node_drone_stranded(state, &d.location)
            }
            _ => Some("drone no longer on site"),
        },
        JobSpec::Reboot { drone } => match drone_of(*drone) {
            Some(d) if d.status == DroneStatus::Disabled => node_drone_stranded(state, &d.location),
            _ => Some("drone no longer disabled"),
        },
        JobSpec::RouteSolve { .. } => state.nav.in_transit.then_some("ship entered transit"),
        JobSpec::Travel { .. } | JobSpec::InstallModule { .. } => None,
    }
}

/// Emergency risk rolls. Returns true when the job failed.
fn roll_risk(state: &mut SimState, job: &mut Job, p_fail: f64, p_glitch: f64, dt: f64) -> bool {
    let t = state.now();
    let seed = state.seed;
    let tick = state.clock.tick;
    let Some(owner) = job.owner else {
        return false;
    };

    if rng::chance(p_fail * dt, seed, RollStream::JobRisk, job.id.0, tick) {
        if let Some(drone) = state.drones.get_mut(&owner) {
            drone.status = DroneStatus::Disabled;
            drone.integrity = (drone.integrity - EMERGENCY_FAIL_DAMAGE).max(0.0);
            let data = EventData::Drone {
                drone: drone.id,
                battery: drone.battery,
                integrity: drone.integrity,
            };
            state.events.push(
                t,
                Event::new(
                    EventKind::DroneDisabled,
                    Severity::Critical,
                    Source::Drone(owner),
                    format!("{owner} disabled during emergency {}", job.kind()),
                )
                .with_data(data),
            );
        }
        fail(state, job, FailureReason::RiskRoll, "emergency risk roll");
        return true;
    }

    if rng::chance(p_glitch * dt, seed, RollStream::JobGlitch, job.id.0, tick) {
        if let Some(drone) = state.drones.get_mut(&owner) {
            drone.integrity = (drone.integrity - EMERGENCY_GLITCH_DAMAGE).max(0.0);
        }
        state.events.push(
            t,
            job_event(
                EventKind::JobGlitch,
                Severity::Warning,
                job,
                format!("{} glitched during {} {}", owner, job.kind(), job.id),
            ),
        );
    }
    false
}

fn complete(state: &mut SimState, catalog: &Catalog, job: &mut Job) {
    let t = state.now();

    match job.spec.clone() {
        JobSpec::Repair { system, amount, .. } => {
            if let Some(sys) = state.systems.get_mut(&system) {
                subsystems::repair(sys, amount, t, &mut state.events);
                let health = sys.health;
                state.events.push(
                    t,
                    Event::new(
                        EventKind::SystemRepaired,
                        Severity::Info,
                        Source::System(system),
                        format!("{system} repaired to {:.0}%", health * 100.0),
                    ),
                );
            }
        }
        JobSpec::BootService { system } => {
            if let Some(sys) = state.systems.get_mut(&system) {
                if let Some(service) = sys.service.as_mut() {
                    service.running = true;
                    let name = service.name.clone();
                    state.events.push(
                        t,
                        Event::new(
                            EventKind::ServiceStarted,
                            Severity::Info,
                            Source::System(system),
                            format!("{name} started on {system}"),
                        )
                        .with_data(EventData::Service {
                            system,
                            service: name,
                        }),
                    );
                }
            }
        }
        JobSpec::Deploy { drone, destination } => {
            let message = format!("{drone} deployed to {destination}");
            move_drone(state, drone, DroneStatus::Deployed, destination, EventKind::DroneDeployed, message);
        }
        JobSpec::Dock { drone, .. } => {
            let message = format!("{drone} docked");
            move_drone(
                state,
                drone,
                DroneStatus::Docked,
                Location::Sector(DRONE_BAY_SECTOR.to_string()),
                EventKind::DroneDocked,
                message,
            );
        }
        JobSpec::Salvage { node, .. } => {
            let total = catalog.node(&node).map_or(0, |n| n.salvage_scrap);
            let taken = state.nav.salvaged.get(&node).copied().unwrap_or(0);
            let scrap = SALVAGE_YIELD.min(total.saturating_sub(taken));
            state.inventory.scrap += scrap;
            *state.nav.salvaged.entry(node.clone()).or_insert(0) += scrap;
            info!(node = %node, scrap, "salvage completed");
            state.events.push(
                t,
                Event::new(
                    EventKind::SalvageCompleted,
                    Severity::Info,
                    Source::Node(node.clone()),
                    format!("Recovered {scrap} scrap from {node}"),
                )
                .with_data(EventData::Salvage { node, scrap }),
            );
        }
        JobSpec::Reboot { drone } => {
            let integrity = state.drone(drone).map_or(0.0, |d| d.integrity);
            let p = reboot_probability(integrity);
            if !rng::chance(p, state.seed, RollStream::Reboot, job.id.0, state.clock.tick) {
                fail(state, job, FailureReason::RebootFailed, "drone did not respond");
                return;
            }
            if let Some(d) = state.drones.get_mut(&drone) {
                d.status = if d.location.is_aboard() {
                    DroneStatus::Docked
                } else {
                    DroneStatus::Deployed
                };
                d.battery = d.battery.max(REBOOT_BATTERY);
                d.low_battery_warned = false;
                let data = EventData::Drone {
                    drone,
                    battery: d.battery,
                    integrity: d.integrity,
                };
                state.events.push(
                    t,
                    Event::new(
                        EventKind::DroneRebooted,
                        Severity::Info,
                        Source::Drone(drone),
                        format!("{drone} rebooted"),
                    )
                    .with_data(data),
                );
            }
        }
        JobSpec::RouteSolve { to } => {
            state.nav.known_routes.insert(to.clone());
            state.events.push(
                t,
                Event::new(
                    EventKind::RouteSolved,
                    Severity::Info,
                    Source::Node(to.clone()),
                    format!("Route to {to} plotted"),
                )
                .with_data(EventData::Navigation { node: to }),
            );
        }
        JobSpec::Travel { to, .. } => {
            state.nav.current_node = to.clone();
            state.nav.in_transit = false;
            state.nav.destination = None;
            if state.power.mode == PowerMode::Cruise {
                set_mode(state, PowerMode::Normal);
            }
            info!(node = %to, "arrived");
            state.events.push(
                t,
                Event::new(
                    EventKind::ArrivedAtNode,
                    Severity::Info,
                    Source::Node(to.clone()),
                    format!("Arrived at {to}"),
                )
                .with_data(EventData::Navigation { node: to }),
            );
        }
        JobSpec::InstallModule { module, effect } => install(state, module, &effect),
    }

    job.status = JobStatus::Completed;
    info!(job = %job.id, kind = %job.kind(), "job completed");
    state.events.push(
        t,
        job_event(
            EventKind::JobCompleted,
            Severity::Info,
            job,
            format!("{} {} completed", job.kind(), job.id),
        ),
    );
}

fn move_drone(
    state: &mut SimState,
    id: DroneId,
    status: DroneStatus,
    location: Location,
    kind: EventKind,
    message: String,
) {
    let t = state.now();
    let Some(drone) = state.drones.get_mut(&id) else {
        return;
    };
    drone.status = status;
    drone.location = location;
    drone.repair_progress_s = 0.0;
    let data = EventData::Drone {
        drone: id,
        battery: drone.battery,
        integrity: drone.integrity,
    };
    state.events.push(
        t,
        Event::new(kind, Severity::Info, Source::Drone(id), message).with_data(data),
    );
}

fn install(state: &mut SimState, module: ModuleId, effect: &ModuleEffect) {
    let t = state.now();
    state.inventory.installed_modules.push(module.clone());
    state.power.bonus_generation_kw += effect.generation_kw;
    state.power.capacity_kwh += effect.battery_capacity_kwh;
    state.power.quality_offset += effect.quality_offset;

    if let Some(target) = effect.upgrades {
        if let Some(sys) = state.systems.get_mut(&target) {
            sys.upgraded = true;
            subsystems::reevaluate(sys, StateCause::ModuleUpgrade, t, &mut state.events);
        }
    }

    info!(module = %module, "module installed");
    state.events.push(
        t,
        Event::new(
            EventKind::ModuleInstalled,
            Severity::Info,
            Source::Ship,
            format!("Installed {module}"),
        )
        .with_data(EventData::Module { module }),
    );
}

//! Job data model: queued, time-delayed units of work.
//!
//! Each job kind carries its own strongly-typed payload, resolved once when
//! the action is validated.

use serde::{Deserialize, Serialize};

use crate::catalog::ModuleEffect;
use crate::constants::*;
use crate::enums::{JobKind, JobStatus, SystemId, TravelProfile};
use crate::types::{DroneId, JobId, Location, ModuleId, NodeId, TargetRef};

/// Kind-specific job payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobSpec {
    Repair {
        system: SystemId,
        drone: DroneId,
        amount: f64,
    },
    BootService {
        system: SystemId,
    },
    Deploy {
        drone: DroneId,
        destination: Location,
    },
    Dock {
        drone: DroneId,
        /// Where the drone was when the dock was ordered.
        from: Location,
    },
    Salvage {
        drone: DroneId,
        node: NodeId,
    },
    Reboot {
        drone: DroneId,
    },
    RouteSolve {
        to: NodeId,
    },
    Travel {
        to: NodeId,
        profile: TravelProfile,
    },
    InstallModule {
        module: ModuleId,
        effect: ModuleEffect,
    },
}

impl JobSpec {
    pub fn kind(&self) -> JobKind {
        match self {
            JobSpec::Repair { .. } => JobKind::Repair,
            JobSpec::BootService { .. } => JobKind::BootService,
            JobSpec::Deploy { .. } => JobKind::Deploy,
            JobSpec::Dock { .. } => JobKind::Dock,
            JobSpec::Salvage { .. } => JobKind::Salvage,
            JobSpec::Reboot { .. } => JobKind::Reboot,
            JobSpec::RouteSolve { .. } => JobKind::RouteSolve,
            JobSpec::Travel { .. } => JobKind::Travel,
            JobSpec::InstallModule { .. } => JobKind::InstallModule,
        }
    }

    /// Drone that must not run two jobs at once.
    pub fn owner(&self) -> Option<DroneId> {
        match self {
            JobSpec::Repair { drone, .. }
            | JobSpec::Deploy { drone, .. }
            | JobSpec::Dock { drone, .. }
            | JobSpec::Salvage { drone, .. }
            | JobSpec::Reboot { drone } => Some(*drone),
            JobSpec::BootService { .. }
            | JobSpec::RouteSolve { .. }
            | JobSpec::Travel { .. }
            | JobSpec::InstallModule { .. } => None,
        }
    }

    pub fn target(&self) -> TargetRef {
        match self {
            JobSpec::Repair { system, .. } | JobSpec::BootService { system } => {
                TargetRef::System(*system)
            }
            JobSpec::Deploy { drone, .. }
            | JobSpec::Dock { drone, .. }
            | JobSpec::Reboot { drone } => TargetRef::Drone(*drone),
            JobSpec::Salvage { node, .. } => TargetRef::Node(node.clone()),
            JobSpec::RouteSolve { to } | JobSpec::Travel { to, .. } => TargetRef::Node(to.clone()),
            JobSpec::InstallModule { module, .. } => TargetRef::Module(module.clone()),
        }
    }

    /// Continuous draw while running (kW).
    pub fn power_kw(&self) -> f64 {
        match self.kind() {
            JobKind::Repair => REPAIR_DRAW_KW,
            JobKind::BootService => BOOT_DRAW_KW,
            JobKind::Deploy => DEPLOY_DRAW_KW,
            JobKind::Dock => DOCK_DRAW_KW,
            JobKind::Salvage => SALVAGE_DRAW_KW,
            JobKind::Reboot => REBOOT_DRAW_KW,
            JobKind::RouteSolve => ROUTE_SOLVE_DRAW_KW,
            JobKind::Travel => TRAVEL_DRAW_KW,
            JobKind::InstallModule => INSTALL_DRAW_KW,
        }
    }
}

/// Per-second stochastic risk carried by emergency jobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub p_fail_per_s: f64,
    pub p_glitch_per_s: f64,
}

impl RiskProfile {
    pub fn emergency() -> Self {
        Self {
            p_fail_per_s: EMERGENCY_FAIL_PER_S,
            p_glitch_per_s: EMERGENCY_GLITCH_PER_S,
        }
    }
}

/// A queued or running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub spec: JobSpec,
    pub status: JobStatus,
    /// Remaining time (seconds).
    pub eta_s: f64,
    /// Time at enqueue (seconds).
    pub total_s: f64,
    pub owner: Option<DroneId>,
    pub target: TargetRef,
    pub risk: Option<RiskProfile>,
    /// Draw while RUNNING (kW).
    pub power_kw: f64,
    /// Simulation time the job was queued at.
    pub queued_at: f64,
}

impl Job {
    pub fn new(id: JobId, spec: JobSpec, eta_s: f64, queued_at: f64) -> Self {
        Self {
            id,
            owner: spec.owner(),
            target: spec.target(),
            power_kw: spec.power_kw(),
            spec,
            status: JobStatus::Queued,
            eta_s,
            total_s: eta_s,
            risk: None,
            queued_at,
        }
    }

    pub fn with_risk(mut self, risk: RiskProfile) -> Self {
        self.risk = Some(risk);
        self
    }

    pub fn kind(&self) -> JobKind {
        self.spec.kind()
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }
}

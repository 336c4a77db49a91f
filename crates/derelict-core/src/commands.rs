//! Player actions sent from the driver to the engine.
//!
//! Actions are validated in full before any side effect; accepted actions
//! either enqueue a job or apply an immediate effect.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{DroneId, JobId, Location, ModuleId, NodeId};

/// All possible player actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    // --- Subsystems ---
    /// Send a drone to repair a subsystem.
    RepairSystem { system: SystemId, drone: DroneId },
    /// Boot the service hosted by a subsystem.
    BootService { system: SystemId },
    /// Manually shed a subsystem (forced offline).
    ShedSystem { system: SystemId },
    /// Clear a manual or automatic shed.
    RestoreSystem { system: SystemId },
    /// Freeze or release a subsystem's state.
    SetStateLock { system: SystemId, locked: bool },
    /// Switch the ship power profile.
    SetPowerMode { mode: PowerMode },

    // --- Drones ---
    /// Launch a docked drone. `emergency` bypasses bay checks at a risk.
    DeployDrone {
        drone: DroneId,
        destination: Location,
        #[serde(default)]
        emergency: bool,
    },
    /// Bring a deployed drone back to the bay.
    DockDrone { drone: DroneId },
    /// Strip the node the drone is deployed at for scrap.
    Salvage { drone: DroneId },
    /// Attempt to restart a disabled drone.
    RebootDrone { drone: DroneId },

    // --- Navigation ---
    /// Compute a route to a node within sensor range.
    SolveRoute { to: NodeId },
    /// Travel along a solved route.
    Travel {
        to: NodeId,
        #[serde(default)]
        profile: TravelProfile,
    },

    // --- Hardware ---
    /// Install a catalog module, paying its scrap cost up front.
    InstallModule { module: ModuleId },

    // --- Diagnostics ---
    /// Cancel a queued or running job.
    CancelJob { job: JobId },
    /// Acknowledge an active alert.
    AcknowledgeAlert { key: AlertKey },
}

impl Action {
    /// Accepted even while the terminal lock is engaged.
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            Action::CancelJob { .. } | Action::AcknowledgeAlert { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::RepairSystem { .. } => "repair_system",
            Action::BootService { .. } => "boot_service",
            Action::ShedSystem { .. } => "shed_system",
            Action::RestoreSystem { .. } => "restore_system",
            Action::SetStateLock { .. } => "set_state_lock",
            Action::SetPowerMode { .. } => "set_power_mode",
            Action::DeployDrone { .. } => "deploy_drone",
            Action::DockDrone { .. } => "dock_drone",
            Action::Salvage { .. } => "salvage",
            Action::RebootDrone { .. } => "reboot_drone",
            Action::SolveRoute { .. } => "solve_route",
            Action::Travel { .. } => "travel",
            Action::InstallModule { .. } => "install_module",
            Action::CancelJob { .. } => "cancel_job",
            Action::AcknowledgeAlert { .. } => "acknowledge_alert",
        }
    }
}

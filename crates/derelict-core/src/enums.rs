//! Enumeration types used throughout the simulation.
//!
//! Every enum serializes as a stable snake_case name; these names appear in
//! save files and must not change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Named ship subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemId {
    PowerCore,
    EnergyDistribution,
    LifeSupport,
    DataCore,
    Sensors,
    DroneBay,
    Security,
}

impl SystemId {
    pub const ALL: [SystemId; 7] = [
        SystemId::PowerCore,
        SystemId::EnergyDistribution,
        SystemId::LifeSupport,
        SystemId::DataCore,
        SystemId::Sensors,
        SystemId::DroneBay,
        SystemId::Security,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SystemId::PowerCore => "power_core",
            SystemId::EnergyDistribution => "energy_distribution",
            SystemId::LifeSupport => "life_support",
            SystemId::DataCore => "data_core",
            SystemId::Sensors => "sensors",
            SystemId::DroneBay => "drone_bay",
            SystemId::Security => "security",
        }
    }
}

/// Discrete operational state of a subsystem.
///
/// Variant order is the severity order: `Offline < Critical < ... < Upgraded`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    #[default]
    Offline,
    Critical,
    Damaged,
    Limited,
    Nominal,
    Upgraded,
}

impl SystemState {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemState::Offline => "offline",
            SystemState::Critical => "critical",
            SystemState::Damaged => "damaged",
            SystemState::Limited => "limited",
            SystemState::Nominal => "nominal",
            SystemState::Upgraded => "upgraded",
        }
    }

    pub fn is_online(self) -> bool {
        self > SystemState::Offline
    }
}

/// Why a subsystem changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateCause {
    Degradation,
    Repair,
    LoadShed,
    QualityCollapse,
    QualityShed,
    ManualShed,
    ManualRestore,
    ModuleUpgrade,
    LockReleased,
}

/// Event and alert severity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

/// Ship-wide power profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerMode {
    #[default]
    Normal,
    /// Reduced subsystem draw; used as the low-power travel profile.
    Cruise,
}

impl PowerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerMode::Normal => "normal",
            PowerMode::Cruise => "cruise",
        }
    }
}

/// How the ship travels between nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelProfile {
    #[default]
    Standard,
    /// Slower, switches the ship into `PowerMode::Cruise` and avoids transit wear.
    Cruise,
}

/// Drone lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DroneStatus {
    #[default]
    Docked,
    Deployed,
    Disabled,
    Lost,
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Job-kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Repair,
    BootService,
    Deploy,
    Dock,
    Salvage,
    Reboot,
    RouteSolve,
    Travel,
    InstallModule,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Repair => "repair",
            JobKind::BootService => "boot_service",
            JobKind::Deploy => "deploy",
            JobKind::Dock => "dock",
            JobKind::Salvage => "salvage",
            JobKind::Reboot => "reboot",
            JobKind::RouteSolve => "route_solve",
            JobKind::Travel => "travel",
            JobKind::InstallModule => "install_module",
        }
    }
}

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Kind-specific interruption (transit, owner lost, target offline).
    Interrupted,
    /// Emergency risk roll failed.
    RiskRoll,
    /// Reboot completed but the drone did not come back.
    RebootFailed,
}

/// One key per alert condition. At most one live alert exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKey {
    PowerDeficit,
    PowerCoreDegraded,
    DistributionUnstable,
    LowPowerQuality,
    BatteryReserveExhausted,
    SocLow,
    SocCritical,
    DroneBayChargingUnavailable,
}

impl AlertKey {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKey::PowerDeficit => "power_deficit",
            AlertKey::PowerCoreDegraded => "power_core_degraded",
            AlertKey::DistributionUnstable => "distribution_unstable",
            AlertKey::LowPowerQuality => "low_power_quality",
            AlertKey::BatteryReserveExhausted => "battery_reserve_exhausted",
            AlertKey::SocLow => "soc_low",
            AlertKey::SocCritical => "soc_critical",
            AlertKey::DroneBayChargingUnavailable => "drone_bay_charging_unavailable",
        }
    }

    pub const ALL: [AlertKey; 8] = [
        AlertKey::PowerDeficit,
        AlertKey::PowerCoreDegraded,
        AlertKey::DistributionUnstable,
        AlertKey::LowPowerQuality,
        AlertKey::BatteryReserveExhausted,
        AlertKey::SocLow,
        AlertKey::SocCritical,
        AlertKey::DroneBayChargingUnavailable,
    ];
}

/// World node category (drives radiation and salvage availability).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Void,
    Wreck,
    Station,
    Asteroid,
    Nebula,
}

macro_rules! display_as_str {
    ($($name:ident),*) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(SystemId, SystemState, PowerMode, JobKind, AlertKey);

impl FromStr for SystemId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        SystemId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ParseError::UnknownName {
                kind: "system",
                input: s.to_string(),
            })
    }
}

impl FromStr for SystemState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offline" => Ok(SystemState::Offline),
            "critical" => Ok(SystemState::Critical),
            "damaged" => Ok(SystemState::Damaged),
            "limited" => Ok(SystemState::Limited),
            "nominal" => Ok(SystemState::Nominal),
            "upgraded" => Ok(SystemState::Upgraded),
            _ => Err(ParseError::UnknownName {
                kind: "state",
                input: s.to_string(),
            }),
        }
    }
}

impl FromStr for AlertKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        AlertKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ParseError::UnknownName {
                kind: "alert",
                input: s.to_string(),
            })
    }
}

impl FromStr for PowerMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(PowerMode::Normal),
            "cruise" => Ok(PowerMode::Cruise),
            _ => Err(ParseError::UnknownName {
                kind: "power mode",
                input: s.to_string(),
            }),
        }
    }
}

//! Events and alerts emitted by the simulation.
//!
//! Events are the only channel from the engine to the outside world. Each
//! one is appended to a bounded ring buffer and also returned from the
//! `tick` / `apply_action` call that produced it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{DroneId, JobId, ModuleId, NodeId, Source, TargetRef};

/// Event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SystemStateChanged,
    ServiceStarted,
    ServiceStopped,
    StateLockChanged,
    PowerDeficit,
    PowerModeChanged,
    JobQueued,
    JobStarted,
    JobCompleted,
    JobFailed,
    JobCancelled,
    JobGlitch,
    ActionBlocked,
    SystemRepaired,
    DroneDeployed,
    DroneDocked,
    DroneDisabled,
    DroneRebooted,
    DroneLost,
    DroneLowBattery,
    DroneRepairMishap,
    SalvageCompleted,
    RouteSolved,
    TravelStarted,
    ArrivedAtNode,
    ModuleInstalled,
    AlertRaised,
    AlertAcknowledged,
    TerminalLockEngaged,
    TerminalLockCleared,
}

/// Machine-readable reason an action was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    UnknownSystem,
    UnknownDrone,
    UnknownNode,
    UnknownSector,
    UnknownModule,
    UnknownJob,
    UnknownAlert,
    DependencyUnmet,
    DroneBayDeployOffline,
    DroneUnavailable,
    DroneNotDocked,
    DroneNotDeployed,
    DroneNotDisabled,
    DroneBatteryLow,
    DroneIntegrityLow,
    WrongLocation,
    InTransit,
    SystemFullyRepaired,
    SystemOffline,
    InsufficientScrap,
    ServiceNotInstalled,
    ServiceAlreadyRunning,
    JobAlreadyQueued,
    PowerQualityLow,
    NodeDepleted,
    AlreadyAtNode,
    RouteAlreadyKnown,
    RouteUnknown,
    OutOfSensorRange,
    ModuleAlreadyInstalled,
    CriticalSystemShedForbidden,
    AlreadyOffline,
    NotForcedOffline,
    JobNotCancellable,
    AlertInactive,
    TerminalLock,
}

impl BlockReason {
    /// Stable reason code.
    pub fn code(self) -> &'static str {
        match self {
            BlockReason::UnknownSystem => "unknown_system",
            BlockReason::UnknownDrone => "unknown_drone",
            BlockReason::UnknownNode => "unknown_node",
            BlockReason::UnknownSector => "unknown_sector",
            BlockReason::UnknownModule => "unknown_module",
            BlockReason::UnknownJob => "unknown_job",
            BlockReason::UnknownAlert => "unknown_alert",
            BlockReason::DependencyUnmet => "dependency_unmet",
            BlockReason::DroneBayDeployOffline => "drone_bay_deploy_offline",
            BlockReason::DroneUnavailable => "drone_unavailable",
            BlockReason::DroneNotDocked => "drone_not_docked",
            BlockReason::DroneNotDeployed => "drone_not_deployed",
            BlockReason::DroneNotDisabled => "drone_not_disabled",
            BlockReason::DroneBatteryLow => "drone_battery_low",
            BlockReason::DroneIntegrityLow => "drone_integrity_low",
            BlockReason::WrongLocation => "wrong_location",
            BlockReason::InTransit => "in_transit",
            BlockReason::SystemFullyRepaired => "system_fully_repaired",
            BlockReason::SystemOffline => "system_offline",
            BlockReason::InsufficientScrap => "insufficient_scrap",
            BlockReason::ServiceNotInstalled => "service_not_installed",
            BlockReason::ServiceAlreadyRunning => "service_already_running",
            BlockReason::JobAlreadyQueued => "job_already_queued",
            BlockReason::PowerQualityLow => "power_quality_low",
            BlockReason::NodeDepleted => "node_depleted",
            BlockReason::AlreadyAtNode => "already_at_node",
            BlockReason::RouteAlreadyKnown => "route_already_known",
            BlockReason::RouteUnknown => "route_unknown",
            BlockReason::OutOfSensorRange => "out_of_sensor_range",
            BlockReason::ModuleAlreadyInstalled => "module_already_installed",
            BlockReason::CriticalSystemShedForbidden => "critical_system_shed_forbidden",
            BlockReason::AlreadyOffline => "already_offline",
            BlockReason::NotForcedOffline => "not_forced_offline",
            BlockReason::JobNotCancellable => "job_not_cancellable",
            BlockReason::AlertInactive => "alert_inactive",
            BlockReason::TerminalLock => "terminal_lock",
        }
    }
}

/// Structured context for a blocked action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDetail {
    None,
    /// First unmet dependency of `system`. `current` is `None` when the
    /// dependency target does not exist.
    Dependency {
        system: SystemId,
        target: SystemId,
        required: SystemState,
        current: Option<SystemState>,
    },
    Threshold {
        required: f64,
        current: f64,
    },
    Scrap {
        required: u32,
        available: u32,
    },
    Target {
        target: TargetRef,
    },
}

/// Typed payload carried by an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventData {
    #[default]
    None,
    StateChange {
        system: SystemId,
        old: SystemState,
        new: SystemState,
        cause: StateCause,
        health: f64,
    },
    Blocked {
        action: String,
        reason: BlockReason,
        detail: BlockDetail,
    },
    Job {
        job: JobId,
        kind: JobKind,
        eta_s: f64,
    },
    JobFailure {
        job: JobId,
        kind: JobKind,
        reason: FailureReason,
    },
    Power {
        load_kw: f64,
        generation_kw: f64,
        available_kw: f64,
    },
    Drone {
        drone: DroneId,
        battery: f64,
        integrity: f64,
    },
    Salvage {
        node: NodeId,
        scrap: u32,
    },
    Navigation {
        node: NodeId,
    },
    Module {
        module: ModuleId,
    },
    Alert {
        key: AlertKey,
        severity: Severity,
    },
    Service {
        system: SystemId,
        service: String,
    },
    Lock {
        system: SystemId,
        locked: bool,
    },
    Mode {
        mode: PowerMode,
    },
}

/// Immutable simulation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sequence number, assigned by `EventLog::push`.
    pub seq: u64,
    /// Simulation time, assigned by `EventLog::push`.
    pub t: f64,
    pub kind: EventKind,
    pub severity: Severity,
    pub source: Source,
    pub message: String,
    pub data: EventData,
}

impl Event {
    pub fn new(
        kind: EventKind,
        severity: Severity,
        source: Source,
        message: impl Into<String>,
    ) -> Self {
        Self {
            seq: 0,
            t: 0.0,
            kind,
            severity,
            source,
            message: message.into(),
            data: EventData::None,
        }
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    /// Reason code, for `action_blocked` events.
    pub fn block_reason(&self) -> Option<BlockReason> {
        match &self.data {
            EventData::Blocked { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Bounded recent-events buffer; the oldest entries are evicted first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    capacity: usize,
    next_seq: u64,
    recent: VecDeque<Event>,
    /// Events produced by the call in progress, drained by the engine.
    #[serde(skip)]
    pending: Vec<Event>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_seq: 0,
            recent: VecDeque::with_capacity(capacity.max(1)),
            pending: Vec::new(),
        }
    }

    /// Stamp and record an event. Returns its sequence number.
    pub fn push(&mut self, t: f64, mut event: Event) -> u64 {
        event.seq = self.next_seq;
        event.t = t;
        self.next_seq += 1;

        // A restored log may carry any capacity, including zero.
        self.capacity = self.capacity.max(1);
        while self.recent.len() >= self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(event.clone());
        self.pending.push(event);
        self.next_seq - 1
    }

    /// Events recorded since the last call.
    pub fn take_pending(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }

    /// Oldest-first view of the ring buffer.
    pub fn recent(&self) -> impl Iterator<Item = &Event> {
        self.recent.iter()
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of events ever recorded.
    pub fn total_recorded(&self) -> u64 {
        self.next_seq
    }
}

/// De-duplicated, persistent notification keyed by condition kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub key: AlertKey,
    pub severity: Severity,
    pub message: String,
    pub first_seen: f64,
    pub last_seen: f64,
    /// Whole seconds spent active and unacknowledged.
    pub unacked_s: u64,
    pub acknowledged: bool,
    pub active: bool,
}

impl Alert {
    pub fn raised(key: AlertKey, severity: Severity, message: impl Into<String>, t: f64) -> Self {
        Self {
            key,
            severity,
            message: message.into(),
            first_seen: t,
            last_seen: t,
            unacked_s: 0,
            acknowledged: false,
            active: true,
        }
    }
}

//! The simulation aggregate: everything a save file contains.
//!
//! Plain data only: no handles, no trait objects. Restoring a serialized
//! `SimState` and replaying the same inputs reproduces the same outputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Drone, Inventory, Navigation, PowerNetwork, Subsystem};
use crate::enums::{AlertKey, SystemId};
use crate::events::{Alert, EventLog};
use crate::jobs::Job;
use crate::types::{DroneId, JobId, SimClock};

/// Complete mutable simulation state, owned by a single driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    /// Process-wide seed for every stochastic roll.
    pub seed: u64,
    pub clock: SimClock,
    pub power: PowerNetwork,
    pub systems: BTreeMap<SystemId, Subsystem>,
    /// Active jobs in queue order.
    pub jobs: Vec<Job>,
    pub next_job_id: u64,
    pub drones: BTreeMap<DroneId, Drone>,
    pub alerts: BTreeMap<AlertKey, Alert>,
    pub events: EventLog,
    pub inventory: Inventory,
    pub nav: Navigation,
    /// Life-critical loss; only diagnostic actions pass while set.
    pub terminal_lock: bool,
    /// How long distribution has been below NOMINAL (seconds).
    pub bus_instability_s: f64,
    /// Fractional seconds not yet credited to alert `unacked_s`.
    pub unacked_carry_s: f64,
}

impl SimState {
    pub fn system(&self, id: SystemId) -> Option<&Subsystem> {
        self.systems.get(&id)
    }

    pub fn system_mut(&mut self, id: SystemId) -> Option<&mut Subsystem> {
        self.systems.get_mut(&id)
    }

    pub fn drone(&self, id: DroneId) -> Option<&Drone> {
        self.drones.get(&id)
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn alert(&self, key: AlertKey) -> Option<&Alert> {
        self.alerts.get(&key)
    }

    pub fn alert_active(&self, key: AlertKey) -> bool {
        self.alerts.get(&key).is_some_and(|a| a.active)
    }

    /// Allocate the next job id.
    pub fn allocate_job_id(&mut self) -> JobId {
        let id = JobId(self.next_job_id);
        self.next_job_id += 1;
        id
    }

    pub fn now(&self) -> f64 {
        self.clock.elapsed_s
    }
}

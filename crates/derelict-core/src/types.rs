//! Identifiers, locations, and simulation time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::enums::{AlertKey, SystemId};
use crate::error::ParseError;

/// Monotonic simulation clock. Advanced only by `tick`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Number of non-empty ticks applied so far.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub elapsed_s: f64,
}

impl SimClock {
    /// Advance by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.tick += 1;
        self.elapsed_s += dt;
    }
}

/// Maintenance drone identifier, displayed as `drone-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DroneId(pub u32);

/// Job identifier, unique for the lifetime of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

/// World-graph node identifier (from the location catalog).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

/// Installable module identifier (from the module catalog).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DroneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "drone-{}", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DroneId {
    type Err = ParseError;

    /// Accepts `drone-3` or a bare `3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix("drone-").unwrap_or(s.trim());
        digits
            .parse::<u32>()
            .map(DroneId)
            .map_err(|_| ParseError::InvalidId {
                kind: "drone",
                input: s.to_string(),
            })
    }
}

impl FromStr for JobId {
    type Err = ParseError;

    /// Accepts `job-12` or a bare `12`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix("job-").unwrap_or(s.trim());
        digits
            .parse::<u64>()
            .map(JobId)
            .map_err(|_| ParseError::InvalidId {
                kind: "job",
                input: s.to_string(),
            })
    }
}

/// Where a drone physically is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Location {
    /// A named sector inside the ship (e.g. the drone bay).
    Sector(String),
    /// A node of the world graph outside the ship.
    Node(NodeId),
}

impl Location {
    pub fn sector(name: impl Into<String>) -> Self {
        Location::Sector(name.into())
    }

    /// World node, if the location is outside the ship.
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Location::Node(id) => Some(id),
            Location::Sector(_) => None,
        }
    }

    pub fn is_aboard(&self) -> bool {
        matches!(self, Location::Sector(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Sector(name) => write!(f, "sector {name}"),
            Location::Node(id) => write!(f, "node {id}"),
        }
    }
}

/// What a job or blocked action refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TargetRef {
    System(SystemId),
    Drone(DroneId),
    Node(NodeId),
    Module(ModuleId),
    Job(JobId),
    Alert(AlertKey),
    Ship,
}

/// Originator of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Source {
    Ship,
    Power,
    System(SystemId),
    Drone(DroneId),
    Job(JobId),
    Alert(AlertKey),
    Node(NodeId),
}

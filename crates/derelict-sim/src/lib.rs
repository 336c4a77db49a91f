//! Simulation engine for DERELICT.
//!
//! Owns the ship state aggregate, validates player actions into jobs and
//! immediate effects, and advances every model by explicit time steps.
//! Events are the only output channel.

pub mod actions;
pub mod engine;
pub mod gate;
pub mod hooks;
pub mod rng;
pub mod scenario;
pub mod systems;

pub use derelict_core as core;
pub use engine::{SimConfig, SimulationEngine};
pub use hooks::JobHook;

#[cfg(test)]
mod tests;

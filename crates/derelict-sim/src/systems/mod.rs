//! Per-tick simulation steps that operate on the state aggregate.
//!
//! Steps are plain functions over `&mut SimState`. They do not own state;
//! everything lives in the aggregate so a save is a single serialization.

pub mod alerts;
pub mod drones;
pub mod jobs;
pub mod power;
pub mod subsystems;

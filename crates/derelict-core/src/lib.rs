//! Core types and definitions for the DERELICT ship simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! ship components, actions, jobs, events, alerts, catalogs, the
//! serializable aggregate, and tuning constants. It has no dependency on
//! any runtime, driver, or presentation layer.

pub mod catalog;
pub mod commands;
pub mod components;
pub mod constants;
pub mod enums;
pub mod error;
pub mod events;
pub mod jobs;
pub mod state;
pub mod types;

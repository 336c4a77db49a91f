//! DERELICT driver.
//!
//! Owns the engine behind a shared session, runs it on a background
//! auto-tick thread or in bounded hibernation chunks, and saves or restores
//! the whole ship aggregate.

pub mod config;
pub mod game_loop;
pub mod persistence;
pub mod state;

pub use derelict_core as core;

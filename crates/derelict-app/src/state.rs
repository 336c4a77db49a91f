//! Session shared between the driver, the auto-tick thread and any reader.

use std::sync::{Arc, Mutex, MutexGuard};

use derelict_core::commands::Action;
use derelict_sim::SimulationEngine;

/// The one engine of a running game. Every read or mutation takes the lock.
pub type Session = Arc<Mutex<SimulationEngine>>;

pub fn new_session(engine: SimulationEngine) -> Session {
    Arc::new(Mutex::new(engine))
}

/// Lock the session, recovering a poisoned lock. Mutators never unwind
/// mid-step, so the aggregate is whole either way.
pub fn lock(session: &Session) -> MutexGuard<'_, SimulationEngine> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Commands sent from the driver to the auto-tick thread.
#[derive(Debug)]
pub enum LoopCommand {
    /// A player action to apply before the next tick.
    Action(Action),
    /// Stop advancing time; actions are still applied.
    Pause,
    Resume,
    /// Shut down the loop thread gracefully.
    Shutdown,
}

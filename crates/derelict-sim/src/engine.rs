//! Simulation engine: the core of the game.
//!
//! `SimulationEngine` owns the state aggregate and the read-only catalog,
//! validates player actions, and advances every model by explicit time
//! steps. Completely headless and deterministic: two engines built from the
//! same seed and fed the same inputs produce the same events.

use derelict_core::catalog::Catalog;
use derelict_core::commands::Action;
use derelict_core::constants::EVENT_LOG_CAPACITY;
use derelict_core::enums::{Severity, SystemId, SystemState};
use derelict_core::events::{Event, EventKind};
use derelict_core::state::SimState;
use derelict_core::types::Source;
use tracing::{debug, info, warn};

use crate::actions;
use crate::hooks::JobHook;
use crate::scenario;
use crate::systems;

/// Configuration for starting a new simulation.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Seed for every stochastic roll. Same seed = same simulation.
    pub seed: u64,
    /// Size of the recent-events ring buffer.
    pub event_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            event_capacity: EVENT_LOG_CAPACITY,
        }
    }
}

/// The simulation engine. Owns the state aggregate.
pub struct SimulationEngine {
    state: SimState,
    catalog: Catalog,
    hooks: Vec<Box<dyn JobHook>>,
}

impl SimulationEngine {
    /// Fresh derelict with the default catalog.
    pub fn new(config: SimConfig) -> Self {
        Self::with_catalog(config, scenario::default_catalog())
    }

    /// Fresh derelict with a caller-supplied catalog.
    pub fn with_catalog(config: SimConfig, catalog: Catalog) -> Self {
        Self::from_state(scenario::fresh_state(config.seed, config.event_capacity), catalog)
    }

    /// Resume from a restored aggregate.
    pub fn from_state(mut state: SimState, catalog: Catalog) -> Self {
        // Events recorded before the engine existed are history, not output.
        state.events.take_pending();
        Self {
            state,
            catalog,
            hooks: Vec::new(),
        }
    }

    /// Register a collaborator notified of every completed job.
    pub fn add_hook(&mut self, hook: impl JobHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Advance the simulation by `dt` seconds and return every event
    /// generated during the step. `dt <= 0` is a no-op.
    pub fn tick(&mut self, dt: f64) -> Vec<Event> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Vec::new();
        }

        self.state.clock.advance(dt);
        self.run_systems(dt)
    }

    /// Validate and apply an action. A rejected action yields exactly one
    /// `action_blocked` event and leaves the state untouched.
    pub fn apply_action(&mut self, action: &Action) -> Vec<Event> {
        if let Err(blocked) = actions::apply(&mut self.state, &self.catalog, action) {
            debug!(action = action.name(), reason = blocked.reason.code(), "action blocked");
            let t = self.state.now();
            self.state.events.push(t, actions::blocked_event(action, blocked));
        }
        self.state.events.take_pending()
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Direct mutable access for drivers scripting scenarios.
    pub fn state_mut(&mut self) -> &mut SimState {
        &mut self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn into_state(self) -> SimState {
        self.state
    }

    /// Run all steps in order.
    fn run_systems(&mut self, dt: f64) -> Vec<Event> {
        // 1. Power network (generation, shedding, quality, battery)
        systems::power::run(&mut self.state, dt);
        // 2. Subsystem degradation
        systems::subsystems::degrade(&mut self.state, &self.catalog, dt);
        // 3. Job scheduler
        let completed = systems::jobs::run(&mut self.state, &self.catalog, dt);
        // 4. Drone maintenance
        systems::drones::run(&mut self.state, &self.catalog, dt);
        // 5. Terminal lock
        self.update_terminal_lock();
        // 6. Alerts
        systems::alerts::run(&mut self.state, dt);

        let events = self.state.events.take_pending();
        if !self.hooks.is_empty() {
            for done in &completed {
                let produced: Vec<Event> = events
                    .iter()
                    .filter(|e| done.events.contains(&e.seq))
                    .cloned()
                    .collect();
                for hook in &mut self.hooks {
                    hook.on_job_completed(&done.job, &produced);
                }
            }
        }
        events
    }

    fn update_terminal_lock(&mut self) {
        let t = self.state.now();
        let life_support = self
            .state
            .system(SystemId::LifeSupport)
            .map_or(SystemState::Offline, |s| s.state);
        let lost = life_support == SystemState::Offline;

        if lost == self.state.terminal_lock {
            return;
        }
        self.state.terminal_lock = lost;

        let event = if lost {
            warn!("life support offline, terminal lock engaged");
            Event::new(
                EventKind::TerminalLockEngaged,
                Severity::Critical,
                Source::Ship,
                "Life support offline: terminal locked to diagnostics",
            )
        } else {
            info!("life support restored, terminal lock cleared");
            Event::new(
                EventKind::TerminalLockCleared,
                Severity::Info,
                Source::Ship,
                "Life support restored: terminal unlocked",
            )
        };
        self.state.events.push(t, event);
    }
}

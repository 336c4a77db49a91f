//! Subsystem state machine and degradation.
//!
//! State is a pure function of health through fixed bands, except that
//! `forced_offline` always yields OFFLINE and `state_locked` freezes the
//! current state. Every band crossing emits `system_state_changed`.

use derelict_core::catalog::Catalog;
use derelict_core::components::Subsystem;
use derelict_core::constants::*;
use derelict_core::enums::{PowerMode, Severity, StateCause, SystemId, SystemState};
use derelict_core::events::{Event, EventData, EventKind, EventLog};
use derelict_core::state::SimState;
use derelict_core::types::Source;

/// Map continuous health to a discrete state.
pub fn state_for_health(health: f64) -> SystemState {
    if health <= 0.0 {
        SystemState::Offline
    } else if health < HEALTH_DAMAGED {
        SystemState::Critical
    } else if health < HEALTH_LIMITED {
        SystemState::Damaged
    } else if health < HEALTH_NOMINAL {
        SystemState::Limited
    } else {
        SystemState::Nominal
    }
}

/// The state `sys` should be in right now.
pub fn derive_state(sys: &Subsystem) -> SystemState {
    if sys.forced_offline {
        return SystemState::Offline;
    }
    if sys.state_locked {
        return sys.state;
    }
    match state_for_health(sys.health) {
        SystemState::Nominal if sys.upgraded => SystemState::Upgraded,
        state => state,
    }
}

/// Bring `sys.state` in line with its health and overrides. Emits a
/// state-change event on any transition and stops the attached service
/// when the subsystem is OFFLINE or out of health. Returns true on change.
pub fn reevaluate(sys: &mut Subsystem, cause: StateCause, t: f64, events: &mut EventLog) -> bool {
    let old = sys.state;
    let new = derive_state(sys);
    let changed = old != new;

    if changed {
        sys.state = new;
        let severity = if new > old {
            Severity::Info
        } else if new <= SystemState::Critical {
            Severity::Critical
        } else {
            Severity::Warning
        };
        events.push(
            t,
            Event::new(
                EventKind::SystemStateChanged,
                severity,
                Source::System(sys.id),
                format!("{}: {} -> {}", sys.id, old, new),
            )
            .with_data(EventData::StateChange {
                system: sys.id,
                old,
                new,
                cause,
                health: sys.health,
            }),
        );
    }

    debug_assert!(!sys.forced_offline || sys.state == SystemState::Offline);

    if sys.state == SystemState::Offline || sys.health <= 0.0 {
        stop_service(sys, t, events);
    }
    changed
}

/// Stop the attached service, if running.
pub fn stop_service(sys: &mut Subsystem, t: f64, events: &mut EventLog) {
    let Some(service) = sys.service.as_mut() else {
        return;
    };
    if !service.running {
        return;
    }
    service.running = false;
    let name = service.name.clone();
    events.push(
        t,
        Event::new(
            EventKind::ServiceStopped,
            Severity::Warning,
            Source::System(sys.id),
            format!("{name} stopped ({} offline)", sys.id),
        )
        .with_data(EventData::Service {
            system: sys.id,
            service: name,
        }),
    );
}

/// Apply one degradation step to every powered subsystem, then re-derive
/// every state.
///
/// `health -= base_decay * (1 + k_power*(1-quality) + k_rad*radiation) * wear * dt`
pub fn degrade(state: &mut SimState, catalog: &Catalog, dt: f64) {
    let t = state.now();
    let quality = state.power.quality;
    let radiation = catalog.radiation_at(&state.nav.current_node) / RADIATION_NORM;
    let wear = if state.nav.in_transit && state.power.mode != PowerMode::Cruise {
        TRANSIT_WEAR_MULTIPLIER
    } else {
        1.0
    };
    let brownout_wear = state.power.brownout_sustained();

    for sys in state.systems.values_mut() {
        if !sys.forced_offline && sys.health > 0.0 {
            let mut rate = sys.base_decay
                * (1.0 + DECAY_K_POWER * (1.0 - quality) + sys.env_sensitivity * radiation)
                * wear;
            if brownout_wear
                && matches!(sys.id, SystemId::PowerCore | SystemId::EnergyDistribution)
            {
                rate *= BROWNOUT_WEAR_FACTOR;
            }
            sys.health = (sys.health - rate * dt).max(0.0);
        }
        reevaluate(sys, StateCause::Degradation, t, &mut state.events);
    }
}

/// Raise health (clamped to 1.0) and re-evaluate.
pub fn repair(sys: &mut Subsystem, amount: f64, t: f64, events: &mut EventLog) -> bool {
    sys.health = (sys.health + amount).clamp(0.0, 1.0);
    reevaluate(sys, StateCause::Repair, t, events)
}
